use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;
    fn open(&mut self, path: &Path) -> std::io::Result<Box<dyn Write>>;
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;
    fn rename(&mut self, from: &Path, to: &Path) -> std::io::Result<()>;
}

pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn open(&mut self, path: &Path) -> std::io::Result<Box<dyn Write>> {
        Ok(Box::new(
            std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?,
        ))
    }

    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn rename(&mut self, from: &Path, to: &Path) -> std::io::Result<()> {
        std::fs::rename(from, to)
    }
}

#[derive(Default)]
pub struct FakeFile {
    pub data: Vec<u8>,
}

pub type SharedFakeFile = Rc<RefCell<FakeFile>>;

pub struct FakeFileWriter {
    pub file: SharedFakeFile,
}

impl Write for FakeFileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.borrow_mut().data.extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// In-memory file system used by tests.
#[derive(Default)]
pub struct TestFileSystem {
    pub files: HashMap<PathBuf, SharedFakeFile>,
    pub fail_writes: bool,
}

impl TestFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: &str) -> Self {
        let file = FakeFile {
            data: content.as_bytes().to_vec(),
        };
        self.files.insert(path.into(), Rc::new(RefCell::new(file)));
        self
    }

    pub fn content(&self, path: &Path) -> Option<String> {
        self.files
            .get(path)
            .map(|f| String::from_utf8_lossy(&f.borrow().data).into_owned())
    }
}

impl FileSystem for TestFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn open(&mut self, path: &Path) -> std::io::Result<Box<dyn Write>> {
        if self.fail_writes {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            ));
        }
        let file = Rc::new(RefCell::new(FakeFile::default()));
        self.files.insert(path.to_path_buf(), file.clone());
        Ok(Box::new(FakeFileWriter { file }))
    }

    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        self.content(path).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "Not found")
        })
    }

    fn rename(&mut self, from: &Path, to: &Path) -> std::io::Result<()> {
        let file = self.files.remove(from).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "Not found")
        })?;
        self.files.insert(to.to_path_buf(), file);
        Ok(())
    }
}
