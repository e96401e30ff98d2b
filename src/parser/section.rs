//! Lazy iteration over sections and their entities.
//!
//! [`SectionIter`] produces one [`Section`] descriptor per section header: an
//! id, a payload sub-view, and a location. No payload is parsed until the
//! caller asks for it through [`LazyItems`], which yields entities one at a
//! time. An error inside one entity stops that section's sequence; the outer
//! iterator is unaffected and carries on at the next section header.
//!
//! Iterators are single-pass, but construction is cheap and deterministic:
//! rebuilding one from the same input replays the same sequence.

use crate::error::{Error, ErrorKind};
use crate::location::Location;
use crate::parser::cursor::Cursor;
use crate::parser::encoding::SectionId;
use crate::parser::read::ReadItem;
use crate::parser::ReadContext;
use std::marker::PhantomData;

/// One section: id, unparsed payload sub-view, and the payload's location.
#[derive(Debug, Clone, Copy)]
pub enum Section<'a> {
    Known {
        id: SectionId,
        payload: Cursor<'a>,
        location: Location,
    },
    Custom {
        name: &'a str,
        /// The payload after the name.
        payload: Cursor<'a>,
        location: Location,
    },
}

impl<'a> Section<'a> {
    pub fn id(&self) -> SectionId {
        match self {
            Section::Known { id, .. } => *id,
            Section::Custom { .. } => SectionId::Custom,
        }
    }

    pub fn location(&self) -> Location {
        match self {
            Section::Known { location, .. } | Section::Custom { location, .. } => *location,
        }
    }

    pub fn payload(&self) -> Cursor<'a> {
        match self {
            Section::Known { payload, .. } | Section::Custom { payload, .. } => *payload,
        }
    }
}

/// Lazy sequence of sections after the module header.
pub struct SectionIter<'a, 'e> {
    cursor: Cursor<'a>,
    ctx: ReadContext<'e>,
    done: bool,
}

impl<'a, 'e> SectionIter<'a, 'e> {
    /// Iterate sections from `cursor`, which must sit just past the 8-byte
    /// module header.
    pub fn new(cursor: Cursor<'a>, ctx: ReadContext<'e>) -> Self {
        Self {
            cursor,
            ctx,
            done: false,
        }
    }

    /// Read one section header. `None` with `done` still false means the
    /// section was skipped (unknown id, bad custom name) and iteration
    /// should continue.
    fn read_section(&mut self) -> Option<Section<'a>> {
        let _scope = self.ctx.sink.enter("section");
        let header_start = self.cursor.pos();

        let id_raw = match self.ctx.sink.check(self.cursor.read_var_u32()) {
            Ok(id) => id,
            Err(_) => {
                self.done = true;
                return None;
            }
        };

        let payload_len = match self.ctx.sink.check(self.cursor.read_var_u32()) {
            Ok(len) => len,
            Err(_) => {
                self.done = true;
                return None;
            }
        };

        if payload_len as usize > self.cursor.remaining() {
            self.ctx.sink.report(Error::new(
                ErrorKind::LengthMismatch,
                Location::at(header_start),
                format!(
                    "section length is too long: {} > {}",
                    payload_len,
                    self.cursor.remaining()
                ),
            ));
            self.done = true;
            return None;
        }

        // subview cannot fail: length was just checked
        let mut payload = match self.cursor.subview(payload_len as usize) {
            Ok(payload) => payload,
            Err(e) => {
                self.ctx.sink.report(e);
                self.done = true;
                return None;
            }
        };
        let location = Location::new(payload.pos(), payload.end());

        let id = match SectionId::decode(id_raw) {
            Some(id) => id,
            None => {
                self.ctx.sink.report(Error::new(
                    ErrorKind::UnknownSection,
                    Location::at(header_start),
                    format!("unknown section id {id_raw}"),
                ));
                // Skip this section's payload; later sections may be fine.
                return None;
            }
        };

        if id == SectionId::Custom {
            let name = match self.ctx.sink.check(payload.read_name()) {
                Ok(name) => name,
                // A custom section with a malformed name is skipped whole.
                Err(_) => return None,
            };
            log::debug!("custom section '{name}' at {location}");
            Some(Section::Custom {
                name,
                payload,
                location,
            })
        } else {
            log::debug!("{id} section at {location}");
            Some(Section::Known {
                id,
                payload,
                location,
            })
        }
    }
}

impl<'a> Iterator for SectionIter<'a, '_> {
    type Item = Section<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done || self.cursor.is_empty() {
                return None;
            }
            if let Some(section) = self.read_section() {
                return Some(section);
            }
        }
    }
}

/// Lazy sequence of entities inside one section payload.
///
/// Reads the leading count eagerly (with the count-vs-remaining sanity
/// check), then one entity per `next()`. An entity error reports to the sink
/// and fuses the sequence.
pub struct LazyItems<'a, 'e, T: ReadItem<'a>> {
    cursor: Cursor<'a>,
    ctx: ReadContext<'e>,
    remaining: u32,
    failed: bool,
    _marker: PhantomData<T>,
}

impl<'a, 'e, T: ReadItem<'a>> LazyItems<'a, 'e, T> {
    /// Start a lazy sequence over a section payload. `max_count` is the
    /// implementation limit for this entity kind.
    pub fn new(mut cursor: Cursor<'a>, ctx: ReadContext<'e>, max_count: u32) -> Self {
        let _scope = ctx.sink.enter(T::LABEL);
        let (remaining, failed) = match ctx.sink.check(cursor.read_count()) {
            Ok(count) if count > max_count => {
                ctx.sink.report(Error::new(
                    ErrorKind::LengthMismatch,
                    Location::at(cursor.pos()),
                    format!("{} count {count} exceeds implementation limit", T::LABEL),
                ));
                (0, true)
            }
            Ok(count) => (count, false),
            Err(_) => (0, true),
        };
        Self {
            cursor,
            ctx,
            remaining,
            failed,
            _marker: PhantomData,
        }
    }

    /// Entities left to yield.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Whether this sequence stopped early on an error.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Bytes left unread in the section payload.
    pub fn leftover(&self) -> usize {
        self.cursor.remaining()
    }

    /// Current absolute offset inside the section payload.
    pub fn pos(&self) -> usize {
        self.cursor.pos()
    }
}

impl<'a, T: ReadItem<'a>> Iterator for LazyItems<'a, '_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 {
            return None;
        }
        match T::read_item(&mut self.cursor, &self.ctx) {
            Ok(item) => {
                self.remaining -= 1;
                Some(item)
            }
            Err(_) => {
                // The sub-cursor is abandoned at the failure point; the
                // enclosing section iterator already sits past this payload.
                self.failed = true;
                self.cursor.skip_to_end();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorSink;
    use crate::features::Features;
    use crate::parser::module::FunctionType;

    fn module_bytes(sections: &[(u8, &[u8])]) -> Vec<u8> {
        let mut bytes = vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
        for (id, payload) in sections {
            bytes.push(*id);
            bytes.push(payload.len() as u8);
            bytes.extend_from_slice(payload);
        }
        bytes
    }

    fn sections_after_header<'a, 'e>(
        bytes: &'a [u8],
        ctx: ReadContext<'e>,
    ) -> SectionIter<'a, 'e> {
        let mut cursor = Cursor::new(bytes);
        cursor.read_bytes(8).unwrap();
        SectionIter::new(cursor, ctx)
    }

    #[test]
    fn empty_module_has_no_sections() {
        let sink = ErrorSink::new();
        let bytes = module_bytes(&[]);
        let ctx = ReadContext::new(Features::none(), &sink);
        assert_eq!(sections_after_header(&bytes, ctx).count(), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn yields_section_descriptors_without_parsing() {
        let sink = ErrorSink::new();
        // A type section with a bogus payload: the iterator must not care.
        let bytes = module_bytes(&[(1, &[0xff, 0xff, 0xff]), (11, &[0x00])]);
        let ctx = ReadContext::new(Features::none(), &sink);
        let sections: Vec<_> = sections_after_header(&bytes, ctx).collect();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].id(), SectionId::Type);
        assert_eq!(sections[0].payload().remaining(), 3);
        assert_eq!(sections[1].id(), SectionId::Data);
        assert!(sink.is_empty(), "{:?}", sink.to_vec());
    }

    #[test]
    fn section_length_past_end_is_length_mismatch_at_header() {
        let sink = ErrorSink::new();
        let mut bytes = module_bytes(&[]);
        bytes.extend_from_slice(&[0x01, 0x7f]); // type section claiming 127 bytes
        let ctx = ReadContext::new(Features::none(), &sink);
        assert_eq!(sections_after_header(&bytes, ctx).count(), 0);
        let diagnostics = sink.to_vec();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].error.kind, ErrorKind::LengthMismatch);
        assert_eq!(diagnostics[0].error.location, Location::at(8));
    }

    #[test]
    fn unknown_section_is_skipped_not_fatal() {
        let sink = ErrorSink::new();
        let bytes = module_bytes(&[(40, &[0xaa, 0xbb]), (11, &[0x00])]);
        let ctx = ReadContext::new(Features::none(), &sink);
        let sections: Vec<_> = sections_after_header(&bytes, ctx).collect();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].id(), SectionId::Data);
        assert_eq!(sink.to_vec()[0].error.kind, ErrorKind::UnknownSection);
    }

    #[test]
    fn custom_section_carries_name_and_payload() {
        let sink = ErrorSink::new();
        let mut payload = vec![4u8];
        payload.extend_from_slice(b"name");
        payload.extend_from_slice(&[0x01, 0x02]);
        let bytes = module_bytes(&[(0, &payload)]);
        let ctx = ReadContext::new(Features::none(), &sink);
        let sections: Vec<_> = sections_after_header(&bytes, ctx).collect();
        match sections.as_slice() {
            [Section::Custom { name, payload, .. }] => {
                assert_eq!(*name, "name");
                assert_eq!(payload.rest(), &[0x01, 0x02]);
            }
            other => panic!("unexpected sections: {other:?}"),
        }
    }

    #[test]
    fn iteration_is_restartable_and_deterministic() {
        let sink = ErrorSink::new();
        let bytes = module_bytes(&[(1, &[0x00]), (11, &[0x00])]);
        let ctx = ReadContext::new(Features::none(), &sink);
        let first: Vec<_> = sections_after_header(&bytes, ctx).map(|s| s.id()).collect();
        let second: Vec<_> = sections_after_header(&bytes, ctx).map(|s| s.id()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn lazy_items_stop_at_first_bad_entity() {
        let sink = ErrorSink::new();
        // Two types: one valid () -> (), then garbage.
        let payload = [0x02, 0x60, 0x00, 0x00, 0x61, 0x00, 0x00];
        let ctx = ReadContext::new(Features::none(), &sink);
        let items: LazyItems<FunctionType> =
            LazyItems::new(Cursor::new(&payload), ctx, u32::MAX);
        let types: Vec<_> = items.collect();
        assert_eq!(types.len(), 1);
        assert!(!sink.is_empty());
    }

    #[test]
    fn lazy_items_count_sanity_check() {
        let sink = ErrorSink::new();
        // Claims 100 entities but only one byte follows.
        let payload = [0x64, 0x60];
        let ctx = ReadContext::new(Features::none(), &sink);
        let items: LazyItems<FunctionType> =
            LazyItems::new(Cursor::new(&payload), ctx, u32::MAX);
        assert!(items.failed());
        assert_eq!(sink.to_vec()[0].error.kind, ErrorKind::LengthMismatch);
    }
}
