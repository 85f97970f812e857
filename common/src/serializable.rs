use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

/// JSON persistence for config, commitment and witness files.
pub trait Serializable {
    fn serialize_to_file(&self, path: &Path) -> Result<(), std::io::Error>;
    fn deserialize_from_file(path: &Path) -> Result<Self, std::io::Error>
    where
        Self: Sized;
}

impl<T> Serializable for T
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    fn serialize_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = File::create(path)?;

        let serialized = serde_json::to_string_pretty(self)?;
        file.write_all(serialized.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    fn deserialize_from_file(path: &Path) -> Result<Self, std::io::Error>
    where
        Self: Sized,
    {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let value: T = serde_json::from_str(&contents)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        depth: usize,
        root: String,
    }

    #[test]
    fn file_round_trip_creates_parent_dirs() {
        let dir = std::env::temp_dir().join(format!("common-serializable-{}", std::process::id()));
        let path = dir.join("nested").join("sample.json");
        let sample = Sample {
            depth: 21,
            root: "12345".to_string(),
        };

        sample.serialize_to_file(&path).unwrap();
        let loaded = Sample::deserialize_from_file(&path).unwrap();
        assert_eq!(loaded, sample);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn malformed_json_is_an_io_error() {
        let path = std::env::temp_dir().join(format!("common-bad-{}.json", std::process::id()));
        std::fs::write(&path, b"{ not json").unwrap();
        let err = Sample::deserialize_from_file(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        std::fs::remove_file(&path).unwrap();
    }
}
