use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Error;

// ^(Artifact|Root)(Install|Commit|Rollback|Reboot|Error|Fallback)_(Enter|Leave|Error)_[0-9]{2}(_[A-Za-z0-9]+)?$
static SCRIPT_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(Artifact|Root)(Install|Commit|Rollback|Reboot|Error|Fallback)_(Enter|Leave|Error)_[0-9]{2}(_[A-Za-z0-9]+)?$")
        .expect("script name pattern is a valid regex")
});

/// Validates a state-script filename against the pattern in §3. Used by the
/// header assembler on write and the header reader on read, so a malformed
/// script name is rejected symmetrically.
pub fn validate_name(name: &str) -> Result<(), Error> {
    if SCRIPT_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidScriptName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_names() {
        assert!(validate_name("ArtifactInstall_Enter_10").is_ok());
        assert!(validate_name("RootCommit_Leave_99_custom").is_ok());
        assert!(validate_name("ArtifactRollback_Error_00").is_ok());
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(validate_name("foo.sh").is_err());
        assert!(validate_name("ArtifactInstall_Enter_1").is_err());
        assert!(validate_name("BogusState_Enter_10").is_err());
    }
}
