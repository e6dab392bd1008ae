// SPDX-FileCopyrightText: 2025 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

use super::MachineError;
use itertools::Itertools;
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::Range;

const PAGE_LEN: usize = 512;
const PAGE_MASK: i64 = 0x1ff;

macro_rules! page_index {
    ($i: expr) => {{
        #[allow(clippy::cast_sign_loss, reason = "masked down anyway")]
        {
            ($i & PAGE_MASK) as usize
        }
    }};
}

static EMPTY: [i64; PAGE_LEN] = [0; PAGE_LEN];

/// The memory of a [Machine](crate::Machine)
///
/// Memory is split into 512-int pages, which are only allocated once written to, so any
/// non-negative address can be used without reserving space up front. Unwritten addresses read as
/// zero.
///
/// If a limit was set through [MachineConfig](crate::config::MachineConfig), addresses at or past
/// the limit are out of range, as are negative addresses.
pub struct Memory {
    pages: HashMap<i64, Box<[i64; PAGE_LEN]>>,
    limit: Option<i64>,
}

impl Memory {
    pub(crate) fn new(code: impl IntoIterator<Item = i64>, limit: Option<i64>) -> Self {
        let code = code.into_iter();
        let mut pages = HashMap::with_capacity(code.size_hint().0.div_ceil(PAGE_LEN));

        for (page_num, chunk) in (0_i64..).zip(&code.chunks(PAGE_LEN)) {
            let mut page = Box::new([0; PAGE_LEN]);
            page.iter_mut().zip(chunk).for_each(|(cell, i)| *cell = i);
            pages.insert(page_num * PAGE_LEN as i64, page);
        }

        Self { pages, limit }
    }

    /// The address limit, if one was configured
    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    /// Make sure that `address` can be accessed
    pub fn check(&self, address: i64) -> Result<(), MachineError> {
        if address < 0 || self.limit.is_some_and(|limit| address >= limit) {
            Err(MachineError::OutOfRange(address))
        } else {
            Ok(())
        }
    }

    /// Read the int at `address`
    pub fn load(&self, address: i64) -> Result<i64, MachineError> {
        self.check(address)?;
        Ok(self[address])
    }

    pub(crate) fn store(&mut self, address: i64, value: i64) -> Result<(), MachineError> {
        self.check(address)?;
        self.pages
            .entry(address & !PAGE_MASK)
            .or_insert_with(|| Box::new([0; PAGE_LEN]))[page_index!(address)] = value;
        Ok(())
    }

    /// The number of pages that contain at least one non-zero int
    pub fn active_pages(&self) -> usize {
        self.active_segments().len()
    }

    fn active_segments(&self) -> BTreeSet<i64> {
        self.pages
            .iter()
            .filter_map(|(&k, v)| (v.as_ref() != &EMPTY).then_some(k))
            .collect()
    }

    fn get_segment(&self, segment_num: i64) -> &[i64; PAGE_LEN] {
        self.pages.get(&segment_num).map_or(&EMPTY, |s| s.as_ref())
    }

    /// Copy out the ints in `range`, borrowing if the range is within a single page.
    ///
    /// No bounds are checked, so negative or out-of-limit addresses just read as zero. The copy
    /// is allocated up front, so a range too long to fit in memory aborts like any other failed
    /// allocation.
    ///
    /// # Example
    ///
    /// ```
    /// use ivm::prelude::*;
    /// let machine = Machine::new([1, 2, 3], (), ());
    /// assert_eq!(machine.memory().get_range(1..5).as_ref(), &[2, 3, 0, 0]);
    /// ```
    pub fn get_range(&self, range: Range<i64>) -> Cow<'_, [i64]> {
        if range.is_empty() {
            return Cow::Borrowed(&[]);
        }
        let first = range.start;
        let last = range.end - 1;
        let first_segment = first & !PAGE_MASK;
        let last_segment = last & !PAGE_MASK;
        if first_segment == last_segment {
            Cow::Borrowed(&self.get_segment(first_segment)[page_index!(first)..=page_index!(last)])
        } else {
            let mut v = Vec::with_capacity(usize::try_from(span(&range)).unwrap_or(0));
            v.extend_from_slice(&self.get_segment(first_segment)[page_index!(first)..]);
            for segment in ((first_segment + PAGE_LEN as i64)..last_segment).step_by(PAGE_LEN) {
                v.extend_from_slice(self.get_segment(segment));
            }
            v.extend_from_slice(&self.get_segment(last_segment)[..=page_index!(last)]);

            Cow::Owned(v)
        }
    }
}

/// Number of addresses in `range`, which may be wider than `i64::MAX`
fn span(range: &Range<i64>) -> u64 {
    if range.is_empty() {
        0
    } else {
        range.end.abs_diff(range.start)
    }
}

impl PartialEq for Memory {
    fn eq(&self, other: &Self) -> bool {
        let active_segments = self.active_segments();
        other.active_segments() == active_segments
            && active_segments
                .into_iter()
                .all(|seg| self.pages[&seg] == other.pages[&seg])
    }
}

impl std::ops::Index<i64> for Memory {
    type Output = i64;
    fn index(&self, i: i64) -> &i64 {
        self.pages
            .get(&(i & !PAGE_MASK))
            .map_or(&0, |s| s.index(page_index!(i)))
    }
}

impl Clone for Memory {
    fn clone(&self) -> Self {
        // don't copy blank pages
        let pages = self
            .pages
            .iter()
            .filter(|&(_, page)| page.as_ref() != &EMPTY)
            .map(|(&index, page)| (index, page.clone()))
            .collect();
        Self {
            pages,
            limit: self.limit,
        }
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fmtstruct = fmt.debug_map();
        for sn in self.pages.keys().sorted_unstable() {
            if self.pages[sn].as_ref() != &EMPTY {
                fmtstruct.entry(
                    &format_args!("{{ segment 0x{sn:04x} }}"),
                    &format_args!("{:?}", self.pages[sn]),
                );
            }
        }
        fmtstruct.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_across_pages() {
        let mem = Memory::new(0..1200, None);
        assert_eq!(mem[0], 0);
        assert_eq!(mem[511], 511);
        assert_eq!(mem[512], 512);
        assert_eq!(mem[1199], 1199);
        assert_eq!(mem[1200], 0);
        assert_eq!(mem.active_pages(), 3);
    }

    #[test]
    fn range_spanning_pages() {
        let mem = Memory::new(0..600, None);
        assert!(matches!(mem.get_range(3..6), Cow::Borrowed(&[3, 4, 5])));
        let range = mem.get_range(500..1030);
        assert!(matches!(range, Cow::Owned(_)));
        assert_eq!(range.len(), 530);
        assert_eq!(range[0], 500);
        assert_eq!(range[99], 599);
        assert!(range[100..].iter().all(|&i| i == 0));
        assert!(mem.get_range(7..7).is_empty());
    }

    #[test]
    fn range_width() {
        assert_eq!(span(&(3..3)), 0);
        assert_eq!(span(&(5..2)), 0);
        assert_eq!(span(&(-600..10)), 610);
        assert_eq!(span(&(i64::MIN..i64::MAX)), u64::MAX);
        assert_eq!(span(&(i64::MIN..0)), 1 << 63);
    }

    #[test]
    fn range_straddling_zero() {
        let mem = Memory::new([7, 8, 9], None);
        let range = mem.get_range(-600..2);
        assert_eq!(range.len(), 602);
        assert!(range[..600].iter().all(|&i| i == 0));
        assert_eq!(range[600..], [7, 8]);
    }

    #[test]
    fn sparse_stores() {
        let mut mem = Memory::new([], None);
        mem.store(1 << 40, 5).unwrap();
        assert_eq!(mem.load(1 << 40), Ok(5));
        assert_eq!(mem.load((1 << 40) + 1), Ok(0));
        assert_eq!(mem.store(-1, 5), Err(MachineError::OutOfRange(-1)));
        assert_eq!(mem.active_pages(), 1);
    }

    #[test]
    fn limit() {
        let mut mem = Memory::new([1, 2, 3], Some(3));
        assert_eq!(mem.load(2), Ok(3));
        assert_eq!(mem.load(3), Err(MachineError::OutOfRange(3)));
        assert_eq!(mem.store(3, 1), Err(MachineError::OutOfRange(3)));
        assert_eq!(mem.limit(), Some(3));
    }

    #[test]
    fn blank_pages_ignored_by_eq() {
        let mut a = Memory::new([1, 2, 3], None);
        let b = a.clone();
        a.store(5000, 0).unwrap();
        assert_eq!(a, b);
        a.store(5000, 1).unwrap();
        assert_ne!(a, b);
    }
}
