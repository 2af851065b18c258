// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::fs;
use std::io;
use std::path;

const READ_BUFFER_SIZE: usize = 0x10000;

/// Buffered, read-only trace file. Read offsets are tracked by the record reader.
#[derive(Debug)]
pub(crate) struct InputFile {
    inner: io::BufReader<fs::File>,
    inner_len: u64,
}

impl InputFile {
    pub fn new(path: &path::Path) -> io::Result<Self> {
        let mut options = fs::OpenOptions::new();
        options.read(true);

        #[cfg(windows)]
        {
            use std::os::windows::fs::OpenOptionsExt;
            const FILE_SHARE_READ: u32 = 0x00000001;
            const FILE_SHARE_DELETE: u32 = 0x00000004;
            options.share_mode(FILE_SHARE_READ | FILE_SHARE_DELETE);
        }

        let file = options.open(path)?;

        // The length is only used for diagnostics; a file we cannot stat is still readable.
        let inner_len = file.metadata().map(|m| m.len()).unwrap_or(0);

        return Ok(Self {
            inner: io::BufReader::with_capacity(READ_BUFFER_SIZE, file),
            inner_len,
        });
    }

    /// File length when it was opened.
    pub fn len(&self) -> u64 {
        self.inner_len
    }
}

impl io::Read for InputFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut self.inner, buf)
    }
}
