use std::collections::BTreeMap;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use anyhow::Result;
use zip::ZipArchive;

/// Somewhere the GTFS text files can be read from.
pub trait FeedSource {
    /// Returns `None` if the file doesn't exist. Any UTF-8 BOM is stripped.
    fn read_file(&mut self, name: &str) -> Result<Option<Vec<u8>>>;

    fn describe(&self) -> String;

    fn require_file(&mut self, name: &str) -> Result<Vec<u8>> {
        match self.read_file(name)? {
            Some(bytes) => Ok(bytes),
            None => bail!("{} is missing {name}", self.describe()),
        }
    }
}

/// A directory with `stops.txt` and friends directly inside.
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }
}

impl FeedSource for DirSource {
    fn read_file(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(strip_bom(fs_err::read(path)?)))
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// A zipped feed. The files may live at the root of the archive or inside one folder, like
/// `gtfs/stops.txt`.
pub struct ZipSource<R> {
    archive: ZipArchive<R>,
    prefix: String,
    label: String,
}

impl ZipSource<fs_err::File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let label = path.as_ref().display().to_string();
        let file = fs_err::File::open(path.as_ref())?;
        Self::new(file, label)
    }
}

impl<R: Read + Seek> ZipSource<R> {
    pub fn new(reader: R, label: String) -> Result<Self> {
        let archive = ZipArchive::new(reader).map_err(|err| anyhow!("{label}: {err}"))?;
        let prefix = find_prefix(archive.file_names());
        Ok(Self {
            archive,
            prefix,
            label,
        })
    }
}

impl<R: Read + Seek> FeedSource for ZipSource<R> {
    fn read_file(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = format!("{}{name}", self.prefix);
        let mut file = match self.archive.by_name(&path) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(err) => bail!("{}: {path}: {err}", self.label),
        };
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|err| anyhow!("{}: {path}: {err}", self.label))?;
        Ok(Some(strip_bom(bytes)))
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

// Figure out where stops.txt lives, and assume everything else is next to it
fn find_prefix<'a, I: Iterator<Item = &'a str>>(names: I) -> String {
    let mut best: Option<&str> = None;
    for name in names {
        if let Some(prefix) = name.strip_suffix("stops.txt") {
            if !(prefix.is_empty() || prefix.ends_with('/')) {
                continue;
            }
            if best.map(|b| prefix.len() < b.len()).unwrap_or(true) {
                best = Some(prefix);
            }
        }
    }
    best.unwrap_or("").to_string()
}

/// Files held in memory, keyed by name. Handy for tests and for feeds assembled elsewhere.
impl FeedSource for BTreeMap<String, String> {
    fn read_file(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.get(name).map(|x| strip_bom(x.as_bytes().to_vec())))
    }

    fn describe(&self) -> String {
        "in-memory feed".to_string()
    }
}

fn strip_bom(mut bytes: Vec<u8>) -> Vec<u8> {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        bytes.drain(0..3);
    }
    bytes
}
