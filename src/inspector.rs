// src/inspector.rs

//! Tools for inspecting the wire structure of an encoded stream.
//! Useful for checking schema sharing and back-reference emission without decoding.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{HessianError, Result};
use crate::format::tag;
use crate::reader::MAX_DEPTH;

/// A structural report of an encoded stream.
#[derive(Debug, Default, Serialize)]
pub struct StreamReport {
    /// Total size of the stream.
    pub total_bytes: usize,
    /// Class definitions in stream order.
    pub class_definitions: Vec<ClassInfo>,
    /// Instances written per class name.
    pub objects_per_class: BTreeMap<String, usize>,
    /// Number of back-reference markers.
    pub back_references: usize,
    /// Number of maps (typed and untyped).
    pub maps: usize,
    /// Number of lists and arrays.
    pub lists: usize,
    /// Number of top-level values.
    pub roots: usize,
}

/// One class definition as it appears on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct ClassInfo {
    /// Class wire name.
    pub name: String,
    /// Field names in transmission order.
    pub fields: Vec<String>,
}

/// The stream inspector.
#[derive(Debug)]
pub struct StreamInspector;

impl StreamInspector {
    /// Scans `bytes` and returns a structural report. Purely syntactic: no codec or type
    /// space is consulted.
    pub fn inspect(bytes: &[u8]) -> Result<StreamReport> {
        let mut scan = Scan {
            bytes,
            pos: 0,
            open: 0,
            report: StreamReport {
                total_bytes: bytes.len(),
                ..StreamReport::default()
            },
        };
        while scan.pos < bytes.len() {
            scan.token()?;
        }
        if scan.open != 0 {
            return Err(HessianError::Protocol(format!(
                "{} map(s) or list(s) left open at end of stream",
                scan.open
            )));
        }
        Ok(scan.report)
    }
}

struct Scan<'a> {
    bytes: &'a [u8],
    pos: usize,
    open: usize,
    report: StreamReport,
}

impl Scan<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.bytes.len());
        let Some(end) = end else {
            return Err(HessianError::Protocol(format!(
                "truncated at byte {}: {n} more expected",
                self.pos
            )));
        };
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(i32::from_be_bytes(buf))
    }

    fn len32(&mut self) -> Result<usize> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(buf) as usize)
    }

    fn name(&mut self) -> Result<String> {
        let mut buf = [0u8; 2];
        buf.copy_from_slice(self.take(2)?);
        let len = usize::from(u16::from_be_bytes(buf));
        let raw = self.take(len)?;
        Ok(String::from_utf8_lossy(raw).into_owned())
    }

    fn string(&mut self) -> Result<String> {
        match self.u8()? {
            tag::STRING => {
                let len = self.len32()?;
                Ok(String::from_utf8_lossy(self.take(len)?).into_owned())
            }
            other => Err(HessianError::Protocol(format!(
                "field name expected, found tag 0x{other:02x} at byte {}",
                self.pos - 1
            ))),
        }
    }

    fn token(&mut self) -> Result<()> {
        let at = self.pos;
        if self.open == 0 && self.bytes.get(at) != Some(&tag::CLASS_DEF) {
            self.report.roots += 1;
        }
        match self.u8()? {
            tag::NULL | tag::TRUE | tag::FALSE => {}
            tag::INT => {
                self.take(4)?;
            }
            tag::LONG | tag::DOUBLE | tag::DATE => {
                self.take(8)?;
            }
            tag::STRING | tag::BINARY => {
                let len = self.len32()?;
                self.take(len)?;
            }
            tag::UNTYPED_MAP => {
                self.report.maps += 1;
                self.enter(at)?;
            }
            tag::TYPED_MAP => {
                self.name()?;
                self.report.maps += 1;
                self.enter(at)?;
            }
            tag::LIST => {
                self.name()?;
                self.i32()?;
                self.report.lists += 1;
                self.enter(at)?;
            }
            tag::END => {
                self.open = self.open.checked_sub(1).ok_or_else(|| {
                    HessianError::Protocol(format!("unexpected end marker at byte {at}"))
                })?;
            }
            tag::CLASS_DEF => {
                let name = self.name()?;
                let count = self.i32()?;
                let fields = (0..count.max(0))
                    .map(|_| self.string())
                    .collect::<Result<Vec<_>>>()?;
                self.report.class_definitions.push(ClassInfo { name, fields });
            }
            tag::OBJECT => {
                let index = self.i32()?;
                let class = usize::try_from(index)
                    .ok()
                    .and_then(|i| self.report.class_definitions.get(i))
                    .map(|c| c.name.clone())
                    .ok_or_else(|| {
                        HessianError::Protocol(format!(
                            "object at byte {at} names undefined class #{index}"
                        ))
                    })?;
                *self.report.objects_per_class.entry(class).or_default() += 1;
                // The field values follow as ordinary tokens.
                self.open_fields(at, index)?;
            }
            tag::BACK_REF => {
                self.i32()?;
                self.report.back_references += 1;
            }
            other => {
                return Err(HessianError::Protocol(format!(
                    "unknown tag 0x{other:02x} at byte {at}"
                )));
            }
        }
        Ok(())
    }

    /// Scans the field values of an instance so they are not counted as roots.
    fn open_fields(&mut self, at: usize, index: i32) -> Result<()> {
        let count = usize::try_from(index)
            .ok()
            .and_then(|i| self.report.class_definitions.get(i))
            .map_or(0, |c| c.fields.len());
        self.enter(at)?;
        for _ in 0..count {
            self.value()?;
        }
        self.open -= 1;
        Ok(())
    }

    fn enter(&mut self, at: usize) -> Result<()> {
        if self.open >= MAX_DEPTH {
            return Err(HessianError::Protocol(format!(
                "nesting deeper than {MAX_DEPTH} levels at byte {at}"
            )));
        }
        self.open += 1;
        Ok(())
    }

    /// Scans exactly one value, including any class definitions in front of it.
    fn value(&mut self) -> Result<()> {
        let depth = self.open;
        loop {
            let is_def = self.bytes.get(self.pos) == Some(&tag::CLASS_DEF);
            self.token()?;
            if self.open < depth {
                return Err(HessianError::Protocol(format!(
                    "end marker inside an object at byte {}",
                    self.pos - 1
                )));
            }
            if !is_def && self.open == depth {
                return Ok(());
            }
            if self.pos >= self.bytes.len() {
                return Err(HessianError::Protocol("stream ended inside a value".into()));
            }
        }
    }
}

impl std::fmt::Display for StreamReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== HESSIAN STREAM REPORT ===")?;
        writeln!(f, "Size:            {} bytes", self.total_bytes)?;
        writeln!(f, "Roots:           {}", self.roots)?;
        writeln!(f, "Maps / Lists:    {} / {}", self.maps, self.lists)?;
        writeln!(f, "Back-references: {}", self.back_references)?;
        writeln!(f, "\n[CLASSES]")?;
        for class in &self.class_definitions {
            let count = self.objects_per_class.get(&class.name).copied().unwrap_or(0);
            writeln!(
                f,
                "{} ({} fields) x{}: {}",
                class.name,
                class.fields.len(),
                count,
                class.fields.join(", ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_roots_and_structures() -> Result<()> {
        let mut bytes = vec![b'H', b'S', 0, 0, 0, 1, b'k', b'I', 0, 0, 0, 1, b'Z'];
        bytes.extend_from_slice(&[b'V', 0, 0, 0, 0, 0, 0, b'N', b'Z']);
        let report = StreamInspector::inspect(&bytes)?;
        assert_eq!(report.roots, 2);
        assert_eq!(report.maps, 1);
        assert_eq!(report.lists, 1);
        Ok(())
    }

    #[test]
    fn unbalanced_streams_fail() {
        assert!(StreamInspector::inspect(b"HN").is_err());
        assert!(StreamInspector::inspect(b"Z").is_err());
        assert!(StreamInspector::inspect(&[b'I', 0]).is_err());
    }

    #[test]
    fn deep_nesting_is_rejected() {
        // One class with a single field, then instances nested far past the limit.
        let mut bytes = vec![b'C', 0, 1, b'A', 0, 0, 0, 1, b'S', 0, 0, 0, 1, b'n'];
        for _ in 0..200_000 {
            bytes.extend_from_slice(&[b'O', 0, 0, 0, 0]);
        }
        bytes.push(b'N');
        let err = StreamInspector::inspect(&bytes);
        assert!(matches!(err, Err(HessianError::Protocol(msg)) if msg.contains("nesting")));

        let mut lists = Vec::new();
        for _ in 0..=MAX_DEPTH {
            lists.extend_from_slice(&[b'V', 0, 0, 0xff, 0xff, 0xff, 0xff]);
        }
        assert!(StreamInspector::inspect(&lists).is_err());
    }

    #[test]
    fn nesting_within_the_limit_is_accepted() -> Result<()> {
        let mut bytes = Vec::new();
        for _ in 0..MAX_DEPTH {
            bytes.extend_from_slice(&[b'V', 0, 0, 0xff, 0xff, 0xff, 0xff]);
        }
        bytes.extend(std::iter::repeat_n(b'Z', MAX_DEPTH));
        let report = StreamInspector::inspect(&bytes)?;
        assert_eq!(report.lists, MAX_DEPTH);
        assert_eq!(report.roots, 1);
        Ok(())
    }
}
