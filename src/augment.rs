use artifact_model::{TypeInfo, UpdateHandler};

use crate::error::Error;

/// Checks one update's augment `type-info` against its base `type-info`
/// (§4.7): a key present in both `artifact_provides` or `artifact_depends`
/// maps must carry an identical value, unless the caller declared it an
/// overlay-allowed key (e.g. `rootfs-image.checksum`, which augment alone
/// can know). Keys present only in the augment map always pass — that is
/// exactly the mechanism augmenting exists for.
pub fn check_type_info_conflict(
    handler: &dyn UpdateHandler,
    base: &TypeInfo,
    augment: &TypeInfo,
    overlay_allowed: &[String],
) -> Result<(), Error> {
    check_map_conflict(&base.artifact_provides, &augment.artifact_provides, overlay_allowed)?;
    check_map_conflict(&base.artifact_depends, &augment.artifact_depends, overlay_allowed)?;

    if !handler.allows_augment_provides() {
        let introduces_new_provides = augment.artifact_provides.keys().any(|key| !base.artifact_provides.contains_key(key) && !overlay_allowed.iter().any(|allowed| allowed == key));
        if introduces_new_provides {
            return Err(Error::AugmentConflict(format!("update type {:?} does not allow augment-introduced provides keys", handler.type_name())));
        }
    }

    Ok(())
}

fn check_map_conflict(base: &std::collections::BTreeMap<String, String>, augment: &std::collections::BTreeMap<String, String>, overlay_allowed: &[String]) -> Result<(), Error> {
    for (key, augment_value) in augment {
        if overlay_allowed.iter().any(|allowed| allowed == key) {
            continue;
        }
        if let Some(base_value) = base.get(key) {
            if base_value != augment_value {
                return Err(Error::AugmentConflict(format!("key {key:?} is {base_value:?} in base but {augment_value:?} in augment")));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use artifact_model::RootfsImage;

    fn type_info(entries: &[(&str, &str)]) -> TypeInfo {
        let mut info = TypeInfo::default();
        for (k, v) in entries {
            info.artifact_provides.insert(k.to_string(), v.to_string());
        }
        info
    }

    #[test]
    fn allows_new_augment_only_keys() {
        let base = type_info(&[("rootfs-image.version", "1")]);
        let augment = type_info(&[("rootfs-image.checksum", "abc")]);
        check_type_info_conflict(&RootfsImage, &base, &augment, &[]).unwrap();
    }

    #[test]
    fn rejects_contradicting_shared_key() {
        let base = type_info(&[("rootfs-image.version", "1")]);
        let augment = type_info(&[("rootfs-image.version", "2")]);
        assert!(check_type_info_conflict(&RootfsImage, &base, &augment, &[]).is_err());
    }

    #[test]
    fn overlay_allowed_key_may_differ() {
        let base = type_info(&[("rootfs-image.version", "1")]);
        let augment = type_info(&[("rootfs-image.version", "2")]);
        check_type_info_conflict(&RootfsImage, &base, &augment, &["rootfs-image.version".to_string()]).unwrap();
    }
}
