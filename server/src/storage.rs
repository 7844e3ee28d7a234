use log::{info, warn};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

pub const TEMP_DIR: &str = "uploads";

// One spooled multipart file. The path is unique to its request; the
// request that created it must remove it before responding.
pub struct SpooledFile {
    pub path: PathBuf,
    pub original_name: String,
}

pub fn init_temp_dir() -> io::Result<()> {
    let temp_path = PathBuf::from(TEMP_DIR);

    if temp_path.exists() {
        info!("Clearing temp directory...");
        for entry in fs::read_dir(&temp_path)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                fs::remove_dir_all(path)?;
            } else {
                fs::remove_file(path)?;
            }
        }
    } else {
        fs::create_dir(&temp_path)?;
    }
    info!("Temp directory ready");
    Ok(())
}

pub fn temp_path(request_id: &str, field_name: &str) -> PathBuf {
    PathBuf::from(TEMP_DIR).join(format!("{}_{}", request_id, field_name))
}

pub fn remove_temp_file(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        warn!("Failed to remove temp file {}: {}", path.display(), err);
    }
}
