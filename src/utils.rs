//! Utility methods.

use std::boxed::Box;
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Error};
use flate2::read::MultiGzDecoder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

const GZ_BUF_SIZE: usize = 1 << 22;
const JSON_INDENT: &[u8] = b"    ";

/// Open a (possibly gzipped) text file for reading.
pub fn open_with_gz<P: AsRef<Path>>(p: P) -> Result<Box<dyn Read>, Error> {
    let p = p.as_ref();
    let r = File::open(p).with_context(|| format!("couldn't open file {:?}", p))?;

    match p.extension() {
        Some(ext) if ext == "gz" => {
            let gz = MultiGzDecoder::new(r);
            Ok(Box::new(BufReader::with_capacity(GZ_BUF_SIZE, gz)))
        }
        _ => Ok(Box::new(BufReader::with_capacity(32 * 1024, r))),
    }
}

/// Serialize `obj` as JSON indented by four spaces, without a trailing
/// newline.
pub fn to_json_bytes<T: Serialize>(obj: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(JSON_INDENT);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    obj.serialize(&mut ser)?;
    Ok(buf)
}

/// Serialize object `obj` of type `T` to the file `filename`. The file is
/// only created once serialization has succeeded.
pub fn write_json<T: Serialize, P: AsRef<Path> + Debug>(obj: &T, filename: P) -> Result<(), Error> {
    let buf = to_json_bytes(obj)?;
    std::fs::write(&filename, buf).with_context(|| format!("couldn't write file {:?}", filename))?;
    Ok(())
}

/// Deserialize an object of type `T` from the JSON file `filename`
pub fn read_json<T: DeserializeOwned, P: AsRef<Path> + Debug>(filename: P) -> Result<T, Error> {
    let f = File::open(&filename).with_context(|| format!("couldn't open file {:?}", filename))?;
    let reader = BufReader::new(f);
    let obj = serde_json::from_reader(reader)
        .with_context(|| format!("couldn't parse JSON from {:?}", filename))?;
    Ok(obj)
}

#[cfg(test)]
mod test {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::io::Write;

    #[test]
    fn test_open_plain_and_gz() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let plain = dir.path().join("pairs.tsv");
        std::fs::write(&plain, "a\tb\n")?;

        let gz_path = dir.path().join("pairs.tsv.gz");
        let mut enc = GzEncoder::new(File::create(&gz_path)?, Compression::default());
        enc.write_all(b"a\tb\n")?;
        enc.finish()?;

        for p in [&plain, &gz_path] {
            let mut s = String::new();
            open_with_gz(p)?.read_to_string(&mut s)?;
            assert_eq!(s, "a\tb\n");
        }
        Ok(())
    }

    #[test]
    fn test_open_missing() {
        assert!(open_with_gz("does/not/exist.tsv").is_err());
    }

    #[test]
    fn test_json_layout() -> Result<(), Error> {
        let mut m = BTreeMap::new();
        m.insert("a", vec![1, 2]);
        let bytes = to_json_bytes(&m)?;
        assert_eq!(
            String::from_utf8(bytes)?,
            "{\n    \"a\": [\n        1,\n        2\n    ]\n}"
        );
        Ok(())
    }
}
