use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::errors::Result;

const TMP_SUFFIX: &str = "tmp";

/// Serializes `data` to a sibling temp file, then renames it over `path`.
pub fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(data.as_bytes())?;
        file.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Reads a file, returning `None` when it does not exist.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(fs::read_to_string(path)?))
}

pub fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn tmp_path_appends_suffix_to_existing_extension() {
        let path = Path::new("/data/wizard_store.json");
        assert_eq!(tmp_path(path), PathBuf::from("/data/wizard_store.json.tmp"));
    }

    #[test]
    fn write_atomic_creates_parent_and_leaves_no_temp_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("store.json");
        write_atomic(&path, "{}").expect("write");
        assert_eq!(read_optional(&path).expect("read").as_deref(), Some("{}"));
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn read_optional_reports_missing_file_as_none() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("absent.json");
        assert!(read_optional(&missing).expect("read").is_none());
    }
}
