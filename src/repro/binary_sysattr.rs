//! A binary attribute read on two devices
//!
//! libudev hands sysattr values back as C strings, so binary content is cut
//! at the first NUL. A page that starts with a zero byte reads back empty
//! while the file on disk is not.

use super::Transcript;
use crate::core::config::BinarySysattrInput;
use crate::core::error::Result;
use crate::device::traits::{DeviceHandle, DeviceTree};
use log::debug;
use std::fs;
use std::path::Path;

/// Which reading the device is expected to give
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Empty,
    Populated,
}

impl Expect {
    /// Status offset: 0 for the first device, 3 for the second
    fn base(&self) -> i32 {
        match self {
            Expect::Empty => 0,
            Expect::Populated => 3,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Expect::Empty => "first",
            Expect::Populated => "second",
        }
    }
}

fn check_device<T: DeviceTree>(
    tree: &T,
    syspath: &str,
    attribute: &str,
    expect: Expect,
    out: &mut Transcript,
) -> Result<i32> {
    let Some(device) = tree.device_from_syspath(syspath)? else {
        out.note(format!("no {} device at {}", expect.label(), syspath));
        return Ok(expect.base() + 1);
    };

    let Some(value) = device.sysattr_value(attribute)? else {
        out.line(format!("{} {}: (null)", syspath, attribute));
        return Ok(expect.base() + 2);
    };
    out.line(format!(
        "{} {}: {} bytes: {}",
        syspath,
        attribute,
        value.len(),
        String::from_utf8_lossy(&value)
    ));
    out.attach(&format!("{} {} (library)", expect.label(), attribute), &value);

    let on_disk = Path::new(syspath).join(attribute);
    match fs::read(&on_disk) {
        Ok(bytes) => {
            if bytes.len() != value.len() {
                out.note(format!(
                    "{} holds {} bytes, the library returned {}",
                    on_disk.display(),
                    bytes.len(),
                    value.len()
                ));
            }
            out.attach(&format!("{} {} (sysfs)", expect.label(), attribute), &bytes);
        }
        Err(e) => debug!("Cannot read {}: {}", on_disk.display(), e),
    }

    let unexpected = match expect {
        Expect::Empty => !value.is_empty(),
        Expect::Populated => value.is_empty(),
    };
    Ok(if unexpected { expect.base() + 3 } else { 0 })
}

pub fn run<T: DeviceTree>(
    tree: &T,
    input: &BinarySysattrInput,
    out: &mut Transcript,
) -> Result<i32> {
    let status = check_device(
        tree,
        &input.empty_syspath,
        &input.attribute,
        Expect::Empty,
        out,
    )?;
    if status != 0 {
        return Ok(status);
    }

    check_device(
        tree,
        &input.populated_syspath,
        &input.attribute,
        Expect::Populated,
        out,
    )
}
