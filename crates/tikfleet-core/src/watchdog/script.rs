// ── RouterOS script encoder ──
//
// Builds the rollback script a watchdog lease runs on the router. Names
// (menu segments, field names) are validated against a strict character set
// and never quoted; values are always double-quoted with RouterOS escapes.
// Commands are joined with `;`.

use crate::error::CoreError;
use crate::facade::MatchKey;

use super::batch::ResourcePath;

/// Accumulates script commands.
#[derive(Debug, Default, Clone)]
pub struct ScriptEncoder {
    commands: Vec<String>,
}

impl ScriptEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `/<menu> set [find <key>="<v>"] <field>="<value>"`
    pub fn set(
        &mut self,
        path: &ResourcePath,
        key: &MatchKey,
        field: &str,
        value: &str,
    ) -> Result<&mut Self, CoreError> {
        check_name(&key.field, "match field")?;
        check_name(field, "field")?;
        self.commands.push(format!(
            "{} set [find {}={}] {field}={}",
            path.script_menu(),
            key.field,
            quote(&key.value)?,
            quote(value)?
        ));
        Ok(self)
    }

    /// Remove the scheduler entry called `name`, and only that one.
    pub fn remove_scheduler(&mut self, name: &str) -> Result<&mut Self, CoreError> {
        self.commands
            .push(format!("/system scheduler remove [find name={}]", quote(name)?));
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn finish(self) -> String {
        self.commands.join(";")
    }
}

/// Render `value` as a double-quoted RouterOS string literal.
///
/// `\`, `"`, `$` and `?` are backslash-escaped; newline, carriage return and
/// tab use their `\n` `\r` `\t` forms. Any other control character is
/// rejected.
pub fn quote(value: &str) -> Result<String, CoreError> {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' | '"' | '$' | '?' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                return Err(CoreError::Script {
                    message: format!("control character U+{:04X} in value", u32::from(c)),
                });
            }
            c => out.push(c),
        }
    }
    out.push('"');
    Ok(out)
}

/// Menu segments: lowercase letters, digits and `-`.
pub(crate) fn is_segment(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Field names additionally allow `.` (`.id`, `address.list`).
pub(crate) fn is_field_name(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
}

pub(crate) fn check_name(name: &str, what: &str) -> Result<(), CoreError> {
    if is_field_name(name) {
        Ok(())
    } else {
        Err(CoreError::Script {
            message: format!("invalid {what} name {name:?}"),
        })
    }
}
