use crate::error::DomainError;

/// Derive the canonical slug for a record.
///
/// The explicit slug wins when the client sent one, otherwise the name is
/// used. Either source goes through the same normalization: transliterate
/// to ASCII, lowercase, collapse everything else into single dashes. So
/// "Teknoloji Haberleri" becomes "teknoloji-haberleri" and an explicit
/// "Çay & Kahve" becomes "cay-kahve". Inputs that normalize to nothing are
/// rejected rather than silently producing an empty slug.
pub fn derive_slug(explicit: Option<&str>, name: &str) -> Result<String, DomainError> {
    let source = explicit.unwrap_or(name);
    let normalized = slug::slugify(source);
    if normalized.is_empty() {
        return Err(DomainError::Validation(format!(
            "Cannot derive a slug from '{}'",
            source
        )));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_from_name_when_no_explicit_slug() {
        assert_eq!(
            derive_slug(None, "Teknoloji Haberleri").unwrap(),
            "teknoloji-haberleri"
        );
    }

    #[test]
    fn transliterates_non_ascii() {
        assert_eq!(derive_slug(None, "Yazılım Geliştirme").unwrap(), "yazilim-gelistirme");
    }

    #[test]
    fn explicit_slug_is_normalized_too() {
        assert_eq!(derive_slug(Some("Çay & Kahve"), "ignored").unwrap(), "cay-kahve");
    }

    #[test]
    fn rejects_unsluggable_input() {
        assert!(matches!(
            derive_slug(None, "!!!"),
            Err(DomainError::Validation(_))
        ));
    }
}
