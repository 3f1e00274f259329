//! Object key generation.

use rand::Rng;

const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 8;

/// Lower-case a name and replace every run of non `[a-z0-9]` characters
/// with a single hyphen.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "file".to_string()
    } else {
        slug.to_string()
    }
}

/// Derive a collision-resistant object name from an uploaded file name.
///
/// Format: `{slug}-{unix millis}-{8 random [a-z0-9]}{.ext}`. Only the base
/// name is slugified; the extension is kept exactly as uploaded.
pub fn unique_object_name(original: &str) -> String {
    let file_name = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let (base, extension) = match file_name.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() && !ext.is_empty() => (base, Some(ext)),
        _ => (file_name, None),
    };

    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();

    let millis = chrono::Utc::now().timestamp_millis();
    match extension {
        Some(ext) => format!("{}-{}-{}.{}", slugify(base), millis, suffix, ext),
        None => format!("{}-{}-{}", slugify(base), millis, suffix),
    }
}

/// Whether `key` lives under the tenant's prefix.
pub fn belongs_to_tenant(key: &str, tenant_id: &str) -> bool {
    !tenant_id.is_empty()
        && key
            .strip_prefix(tenant_id)
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|rest| !rest.is_empty() && !rest.split('/').any(|s| s == ".."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hemograma Completo (2024)"), "hemograma-completo-2024");
        assert_eq!(slugify("TSH__T4"), "tsh-t4");
        assert_eq!(slugify("***"), "file");
    }

    #[test]
    fn test_unique_name_format() {
        let name = unique_object_name("Exame de Sangue.PDF");
        assert!(name.starts_with("exame-de-sangue-"));
        assert!(name.ends_with(".PDF"));

        let stem = name.trim_end_matches(".PDF");
        let parts: Vec<&str> = stem.rsplitn(3, '-').collect();
        assert_eq!(parts[0].len(), 8);
        assert!(parts[0].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert!(parts[1].parse::<i64>().is_ok());
    }

    #[test]
    fn test_unique_name_keeps_extension_verbatim() {
        let name = unique_object_name("Scan.JPG");
        assert!(name.starts_with("scan-"));
        assert!(name.ends_with(".JPG"));

        let name = unique_object_name("lab_export.v-2");
        assert!(name.starts_with("lab-export-"));
        assert!(name.ends_with(".v-2"));

        let name = unique_object_name("archive.tar_gz");
        assert!(name.starts_with("archive-"));
        assert!(name.ends_with(".tar_gz"));

        let name = unique_object_name("uploads/2026/report.final.pdf");
        assert!(name.starts_with("report-final-"));
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn test_unique_name_without_extension() {
        let name = unique_object_name("notes");
        assert!(name.starts_with("notes-"));
        assert!(!name.contains('.'));

        let name = unique_object_name(".bashrc");
        assert!(!name.ends_with(".bashrc"));
    }

    #[test]
    fn test_unique_names_do_not_collide() {
        let names: HashSet<String> = (0..500).map(|_| unique_object_name("exam.pdf")).collect();
        assert_eq!(names.len(), 500);
    }

    #[test]
    fn test_belongs_to_tenant() {
        assert!(belongs_to_tenant("company-1/exam.pdf", "company-1"));
        assert!(!belongs_to_tenant("company-10/exam.pdf", "company-1"));
        assert!(!belongs_to_tenant("company-1/", "company-1"));
        assert!(!belongs_to_tenant("company-1/../company-2/x.pdf", "company-1"));
        assert!(!belongs_to_tenant("exam.pdf", ""));
    }
}
