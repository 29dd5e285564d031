use crate::{
    codec::{Codec, DumpValue, NumpyMsgpack},
    error::{Error, Result},
    named::{NamedTensors, Selection},
    tensor::{Tensor, TensorBundle},
};
use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// ArrayDumper builder.
pub mod builders {
    use super::{ArrayDumper, Codec, NumpyMsgpack};
    use std::path::PathBuf;

    /// ArrayDumper builder.
    #[derive(Debug)]
    pub struct ArrayDumperBuilder<C = NumpyMsgpack> {
        pub(super) codec: C,
        pub(super) dir: Option<PathBuf>,
        pub(super) create_dirs: bool,
        pub(super) atomic: bool,
    }

    impl Default for ArrayDumperBuilder {
        fn default() -> Self {
            Self {
                codec: NumpyMsgpack,
                dir: None,
                create_dirs: false,
                atomic: true,
            }
        }
    }

    impl<C: Codec> ArrayDumperBuilder<C> {
        /// The codec to encode and decode with. Defaults to [`NumpyMsgpack`].
        pub fn codec<C2: Codec>(self, codec: C2) -> ArrayDumperBuilder<C2> {
            ArrayDumperBuilder {
                codec,
                dir: self.dir,
                create_dirs: self.create_dirs,
                atomic: self.atomic,
            }
        }
        /// The directory relative paths are resolved in. Defaults to the current directory.
        pub fn dir(self, dir: impl Into<PathBuf>) -> Self {
            Self {
                dir: Some(dir.into()),
                ..self
            }
        }
        /// Whether to create missing parent directories when dumping. Defaults to false.
        pub fn create_dirs(self, create_dirs: bool) -> Self {
            Self {
                create_dirs,
                ..self
            }
        }
        /// Whether to write to a temporary file and rename it over the target. Defaults to true.
        ///
        /// When false the target is written in place and removed if the write fails.
        pub fn atomic(self, atomic: bool) -> Self {
            Self { atomic, ..self }
        }
        /// Builds the dumper.
        pub fn build(self) -> ArrayDumper<C> {
            ArrayDumper {
                codec: self.codec,
                dir: self.dir,
                create_dirs: self.create_dirs,
                atomic: self.atomic,
            }
        }
    }
}
use builders::ArrayDumperBuilder;

/// Writes tensors and bundles to files, and reads them back.
///
/// Each dump encodes the whole value in memory first, then writes it to a fresh file, replacing
/// the target. A failed dump leaves no file at the target (an existing file is kept when the
/// dumper is atomic).
#[derive(Debug, Clone)]
pub struct ArrayDumper<C = NumpyMsgpack> {
    codec: C,
    dir: Option<PathBuf>,
    create_dirs: bool,
    atomic: bool,
}

impl Default for ArrayDumper {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ArrayDumper {
    /// A dumper with the default options.
    pub fn new() -> Self {
        Self::default()
    }
    /// Returns an [`ArrayDumperBuilder`] used to specify options.
    pub fn builder() -> ArrayDumperBuilder {
        ArrayDumperBuilder::default()
    }
}

impl<C: Codec> ArrayDumper<C> {
    /// The codec.
    pub fn codec(&self) -> &C {
        &self.codec
    }
    /// Resolves `path` against the output directory.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        match self.dir.as_ref() {
            Some(dir) => dir.join(path),
            None => path.as_ref().to_owned(),
        }
    }
    /// Encodes `value` and writes it to `path`, returning the path written.
    ///
    /// **Errors**
    /// - The codec can not encode the value. Nothing is written.
    /// - The parent directory does not exist (unless `create_dirs`) or the write fails.
    pub fn dump(&self, path: impl AsRef<Path>, value: impl Into<DumpValue>) -> Result<PathBuf> {
        let value = value.into();
        let bytes = self.codec.encode(&value)?;
        let path = self.resolve(path);
        self.write(&path, &bytes)?;
        log::debug!("dumped {} ({} bytes) to {:?}", value.kind(), bytes.len(), path);
        Ok(path)
    }
    /// Dumps the tensors `selection` picks from `source` as a bundle.
    ///
    /// **Errors**
    /// - A selected attribute was not found. Nothing is written.
    /// - See [`dump`](Self::dump).
    pub fn dump_named_bundle<S: NamedTensors + ?Sized>(
        &self,
        path: impl AsRef<Path>,
        source: &S,
        selection: &Selection,
    ) -> Result<PathBuf> {
        let bundle = selection.extract(source)?;
        self.dump(path, bundle)
    }
    /// Reads and decodes the file at `path`.
    ///
    /// **Errors**
    /// - The file can not be read.
    /// - The contents can not be decoded.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<DumpValue> {
        let path = self.resolve(path);
        let bytes = fs::read(&path).map_err(|err| Error::io(&path, err))?;
        let value = self.codec.decode(&bytes)?;
        log::debug!("loaded {} from {:?}", value.kind(), path);
        Ok(value)
    }
    /// Loads a tensor.
    ///
    /// **Errors**
    /// - See [`load`](Self::load).
    /// - The file holds a bundle.
    pub fn load_tensor(&self, path: impl AsRef<Path>) -> Result<Tensor> {
        self.load(path)?.into_tensor()
    }
    /// Loads a bundle.
    ///
    /// **Errors**
    /// - See [`load`](Self::load).
    /// - The file holds a tensor.
    pub fn load_bundle(&self, path: impl AsRef<Path>) -> Result<TensorBundle> {
        self.load(path)?.into_bundle()
    }
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        if self.create_dirs {
            fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
        }
        let previous = fs::metadata(path).ok();
        if previous.is_some() {
            log::debug!("{:?} exists, replacing", path);
        }
        if self.atomic {
            // Mode follows the umask like File::create, not tempfile's 0o600.
            let mut file = tempfile::Builder::new()
                .make_in(parent, |path| {
                    OpenOptions::new().write(true).create_new(true).open(path)
                })
                .map_err(|err| Error::io(parent, err))?;
            file.write_all(bytes)
                .and_then(|()| match previous {
                    Some(previous) => fs::set_permissions(file.path(), previous.permissions()),
                    None => Ok(()),
                })
                .and_then(|()| file.as_file().sync_all())
                .map_err(|err| Error::io(file.path(), err))?;
            file.persist(path)
                .map_err(|err| Error::io(path, err.error))?;
        } else {
            let mut file = File::create(path).map_err(|err| Error::io(path, err))?;
            if let Err(err) = file.write_all(bytes).and_then(|()| file.sync_all()) {
                let _ = fs::remove_file(path);
                return Err(Error::io(path, err));
            }
        }
        Ok(())
    }
}

/// Dumps `value` to `path` with the default [`ArrayDumper`].
///
/// See [`ArrayDumper::dump`].
pub fn dump(path: impl AsRef<Path>, value: impl Into<DumpValue>) -> Result<PathBuf> {
    ArrayDumper::new().dump(path, value)
}

/// Dumps the tensors `selection` picks from `source` with the default [`ArrayDumper`].
///
/// See [`ArrayDumper::dump_named_bundle`].
pub fn dump_named_bundle<S: NamedTensors + ?Sized>(
    path: impl AsRef<Path>,
    source: &S,
    selection: &Selection,
) -> Result<PathBuf> {
    ArrayDumper::new().dump_named_bundle(path, source, selection)
}

/// Loads `path` with the default [`ArrayDumper`].
///
/// See [`ArrayDumper::load`].
pub fn load(path: impl AsRef<Path>) -> Result<DumpValue> {
    ArrayDumper::new().load(path)
}
