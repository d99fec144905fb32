//! Identity lines and detached signatures
//!
//! `author`, `committer` and `tagger` headers share one grammar:
//! `name <email> epoch-seconds zone-offset`.

use crate::errors::GitError;
use chrono::{DateTime, FixedOffset, TimeZone};
use derive_new::new;

/// Author, committer or tagger information
#[derive(Debug, Clone, Eq, PartialEq, new)]
pub struct Signature {
    name: String,
    email: String,
    when: DateTime<FixedOffset>,
}

impl Signature {
    /// Parse an identity line, never failing
    ///
    /// Objects written by buggy tools carry broken identity lines; rejecting
    /// them would make the whole object unreadable. When the `name <email>`
    /// part cannot be located the whole line becomes the name. A broken
    /// timestamp falls back to the unix epoch.
    pub fn from_commit_line(line: &str) -> Self {
        let unknown_time = epoch();

        let Some((name, rest)) = line.split_once(" <") else {
            tracing::warn!(line, "identity line without email");
            return Signature::new(line.to_string(), String::new(), unknown_time);
        };
        let Some((email, time)) = rest.split_once("> ") else {
            tracing::warn!(line, "identity line without timestamp");
            return Signature::new(line.to_string(), String::new(), unknown_time);
        };

        let when = parse_time(time).unwrap_or_else(|| {
            tracing::warn!(line, "identity line with unparseable timestamp");
            unknown_time
        });

        Signature::new(name.to_string(), email.to_string(), when)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn when(&self) -> DateTime<FixedOffset> {
        self.when
    }

    /// Format author name and email for display
    ///
    /// # Returns
    ///
    /// String in format "Name <email@example.com>"
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    /// Format the identity exactly as stored in object headers
    ///
    /// # Returns
    ///
    /// String in format "Name <email> timestamp timezone"
    pub fn display(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.when.timestamp(),
            self.when.format("%z")
        )
    }

    /// Format timestamp in human-readable form
    ///
    /// # Returns
    ///
    /// String like "Mon Jan 1 12:34:56 2024 +0000"
    pub fn readable_timestamp(&self) -> String {
        self.when.format("%a %b %-d %H:%M:%S %Y %z").to_string()
    }
}

impl TryFrom<&str> for Signature {
    type Error = GitError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let invalid = |reason: &str| GitError::InvalidArgument(format!("{reason}: {value:?}"));

        // Format: "name <email> timestamp timezone"
        let email_start = value
            .find('<')
            .ok_or_else(|| invalid("identity line missing '<'"))?;
        let email_end = value
            .rfind('>')
            .filter(|end| *end > email_start)
            .ok_or_else(|| invalid("identity line missing '>'"))?;

        let name = value[..email_start].trim().to_string();
        let email = value[email_start + 1..email_end].to_string();
        let when = parse_time(value[email_end + 1..].trim())
            .ok_or_else(|| invalid("identity line with invalid timestamp"))?;

        Ok(Signature { name, email, when })
    }
}

/// A detached signature together with the exact bytes it signs
#[derive(Debug, Clone, Eq, PartialEq, new)]
pub struct CommitSignature {
    pub signature: String,
    pub payload: String,
}

fn epoch() -> DateTime<FixedOffset> {
    DateTime::<chrono::Utc>::UNIX_EPOCH.fixed_offset()
}

/// Parse `epoch-seconds zone-offset`
fn parse_time(text: &str) -> Option<DateTime<FixedOffset>> {
    let (seconds, zone) = text.trim().split_once(' ')?;
    let seconds = seconds.parse::<i64>().ok()?;
    let offset = parse_offset(zone)?;

    offset.timestamp_opt(seconds, 0).single()
}

/// Parse a `+HHMM` / `-HHMM` zone offset
fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let (sign, digits) = match zone.as_bytes().first()? {
        b'+' => (1, &zone[1..]),
        b'-' => (-1, &zone[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let hours = digits[..2].parse::<i32>().ok()?;
    let minutes = digits[2..].parse::<i32>().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strict_parse_keeps_zone_offset() {
        let signature =
            Signature::try_from("Lucas Michot <lucas@semalead.com> 1484491741 +0100").unwrap();

        assert_eq!(signature.name(), "Lucas Michot");
        assert_eq!(signature.email(), "lucas@semalead.com");
        assert_eq!(signature.when().timestamp(), 1484491741);
        assert_eq!(signature.when().offset().local_minus_utc(), 3600);
        assert_eq!(
            signature.display(),
            "Lucas Michot <lucas@semalead.com> 1484491741 +0100"
        );
    }

    #[test]
    fn strict_parse_rejects_garbage() {
        assert!(Signature::try_from("no email here").is_err());
        assert!(Signature::try_from("name <email> notatime +0000").is_err());
    }

    #[test]
    fn lenient_parse_falls_back_to_whole_line() {
        let signature = Signature::from_commit_line("just a name");

        assert_eq!(signature.name(), "just a name");
        assert_eq!(signature.email(), "");
        assert_eq!(signature.when().timestamp(), 0);
    }

    #[test]
    fn lenient_parse_tolerates_bad_timestamp() {
        let signature = Signature::from_commit_line("A U Thor <author@example.com> yesterday");

        assert_eq!(signature.name(), "A U Thor");
        assert_eq!(signature.email(), "author@example.com");
        assert_eq!(signature.when().timestamp(), 0);
    }

    #[test]
    fn negative_offsets_are_supported() {
        let signature = Signature::from_commit_line("A <a@b.c> 1700000000 -0530");

        assert_eq!(signature.when().offset().local_minus_utc(), -(5 * 3600 + 30 * 60));
        assert_eq!(signature.display(), "A <a@b.c> 1700000000 -0530");
    }
}
