use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};

use crate::Error;

/// Group all sequence diagram datasets are written to.
pub const SEQDIAG_GROUP: &str = "/seqdiag";

/// Destination of named `f64` datasets, organised in groups.
pub trait DiagramWriter {
    fn write(&mut self, data: &[f64], urn: &str, group: &str) -> Result<(), Error>;
}

/// Writes every dataset as raw little-endian `f64` values to
/// `<root>/<group>/<urn>.f64`.
#[derive(Debug, Clone)]
pub struct DirectoryWriter {
    root: PathBuf,
}

impl DirectoryWriter {
    /// Fails if the output directory cannot be created. Nothing is written
    /// in that case.
    pub fn create(root: impl AsRef<Path>) -> Result<Self, Error> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| Error::Export {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dataset_path(&self, urn: &str, group: &str) -> PathBuf {
        self.root
            .join(group.trim_start_matches('/'))
            .join(urn)
            .with_extension("f64")
    }
}

impl DiagramWriter for DirectoryWriter {
    fn write(&mut self, data: &[f64], urn: &str, group: &str) -> Result<(), Error> {
        let path = self.dataset_path(urn, group);
        let export_err = |source| Error::Export {
            path: path.clone(),
            source,
        };

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(export_err)?;
        }
        let mut bytes = vec![0; data.len() * 8];
        LittleEndian::write_f64_into(data, &mut bytes);
        let mut file = File::create(&path).map_err(export_err)?;
        file.write_all(&bytes).map_err(export_err)
    }
}

/// Keeps the datasets in memory, keyed by `<group>/<urn>`.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct MemoryWriter {
    datasets: BTreeMap<String, Vec<f64>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, group: &str, urn: &str) -> Option<&[f64]> {
        self.datasets
            .get(&format!("{group}/{urn}"))
            .map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

impl DiagramWriter for MemoryWriter {
    fn write(&mut self, data: &[f64], urn: &str, group: &str) -> Result<(), Error> {
        self.datasets.insert(format!("{group}/{urn}"), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};

    #[test]
    fn directory_writer_layout() {
        let root = std::env::temp_dir().join(format!("seqtree-export-{}", rand::random::<u64>()));
        let mut writer = DirectoryWriter::create(&root).unwrap();
        let data = [0.0, 1.5, -2.25];
        writer.write(&data, "GX", SEQDIAG_GROUP).unwrap();

        let path = root.join("seqdiag").join("GX.f64");
        check!(writer.dataset_path("GX", SEQDIAG_GROUP) == path);
        let bytes = fs::read(&path).unwrap();
        check!(bytes.len() == 24);
        let mut read = [0.0; 3];
        LittleEndian::read_f64_into(&bytes, &mut read);
        check!(read == data);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn create_fails_on_file() {
        let file = std::env::temp_dir().join(format!("seqtree-file-{}", rand::random::<u64>()));
        fs::write(&file, b"x").unwrap();
        let_assert!(Err(Error::Export { path, .. }) = DirectoryWriter::create(&file));
        check!(path == file);
        fs::remove_file(&file).unwrap();
    }

    #[test]
    fn memory_writer() {
        let mut writer = MemoryWriter::new();
        writer.write(&[1.0, 2.0], "T", SEQDIAG_GROUP).unwrap();
        check!(writer.get(SEQDIAG_GROUP, "T") == Some(&[1.0, 2.0][..]));
        check!(writer.get(SEQDIAG_GROUP, "RXP").is_none());
        check!(writer.len() == 1);
    }
}
