//! Message interpolation.

use crate::core::value::Value;
use indexmap::IndexMap;

/// Turns a message template into the message reported in a violation.
pub trait MessageInterpolator: Send + Sync {
    /// Interpolate `template` with the constraint's attributes.
    fn interpolate(&self, template: &str, attributes: &IndexMap<String, Value>) -> String;
}

/// Replaces `{name}` placeholders with constraint attributes.
///
/// Placeholders without a matching attribute are left as written, braces
/// included. There is no escaping and no expression language.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributeInterpolator;

impl MessageInterpolator for AttributeInterpolator {
    fn interpolate(&self, template: &str, attributes: &IndexMap<String, Value>) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            match after.find('}') {
                Some(close) => {
                    let name = &after[..close];
                    match attributes.get(name) {
                        Some(value) => out.push_str(&value.to_string()),
                        None => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// Leaves templates untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct VerbatimInterpolator;

impl MessageInterpolator for VerbatimInterpolator {
    fn interpolate(&self, template: &str, _attributes: &IndexMap<String, Value>) -> String {
        template.to_string()
    }
}
