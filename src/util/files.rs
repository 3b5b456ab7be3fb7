use serde::de::DeserializeOwned;

use std::{ffi, fs, path};

use crate::Result;

/// open file for reading.
pub fn open_file_r(file: &ffi::OsStr) -> Result<fs::File> {
    let os_file = path::Path::new(file);
    Ok(err_at!(
        IOError,
        fs::OpenOptions::new().read(true).open(os_file)
    )?)
}

/// Locate a configuration file. If `loc` is supplied, it is used as is,
/// otherwise each of `names` is looked up under the current directory
/// and then under the home directory.
pub fn find_config(loc: Option<ffi::OsString>, names: &[&str]) -> Option<ffi::OsString> {
    match loc {
        Some(loc) => Some(loc),
        None => lookup_config(&config_dirs(), names),
    }
}

fn config_dirs() -> Vec<path::PathBuf> {
    let mut locs = vec![];
    if let Ok(dir) = std::env::current_dir() {
        locs.push(dir);
    }
    if let Some(dir) = dirs::home_dir() {
        locs.push(dir);
    }
    locs
}

fn lookup_config(locs: &[path::PathBuf], names: &[&str]) -> Option<ffi::OsString> {
    for dir in locs.iter() {
        for name in names.iter() {
            let file = dir.join(name);
            if file.is_file() {
                return Some(file.into_os_string());
            }
        }
    }
    None
}

/// Load toml file and parse it into type `T`.
pub fn load_toml<P, T>(loc: P) -> Result<T>
where
    P: AsRef<path::Path>,
    T: DeserializeOwned,
{
    let loc = loc.as_ref();
    let text = {
        let data = err_at!(IOError, fs::read(loc), "file:{:?}", loc)?;
        err_at!(InvalidFile, String::from_utf8(data), "file:{:?}", loc)?
    };

    err_at!(InvalidFormat, toml::from_str(&text), "file:{:?}", loc)
}

#[cfg(test)]
#[path = "files_test.rs"]
mod files_test;
