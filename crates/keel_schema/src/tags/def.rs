//! The `!Def` tag: a named integer constant.

use crate::error::ParseError;
use crate::node::TagNode;
use crate::tags::common::{opt, req, req_string, slot, split_args, string_or, options_list, TagCommon};
use serde::{Deserialize, Serialize};

/// A named constant whose value is an expression over other constants.
///
/// Sequence form: `[name, val, sd, ld, options]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Def {
    /// Common attributes.
    pub common: TagCommon,
    /// The raw value expression.
    pub val: String,
}

pub(crate) fn build_def(tag: &TagNode) -> Result<Def, ParseError> {
    let fields = [req("name"), req("val"), opt("sd"), opt("ld"), opt("options")];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;
    Ok(Def {
        common: TagCommon::assemble(
            req_string(slot(&slots, 0), &tag.tag, "name", loc)?,
            string_or(slot(&slots, 2), &tag.tag, "sd", "", loc)?,
            string_or(slot(&slots, 3), &tag.tag, "ld", "", loc)?,
            options_list(slot(&slots, 4), &tag.tag, loc)?,
            loc,
        ),
        val: req_string(slot(&slots, 1), &tag.tag, "val", loc)?,
    })
}
