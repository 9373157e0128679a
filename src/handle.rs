use std::fmt::{Display, Formatter};

/// Number of bits used for the in-page item index.
pub const ITEM_BITS: u32 = 20;
/// Number of bits used for the page index.
pub const PAGE_BITS: u32 = 11;

/// The maximum number of items on a single page.
pub const MAX_ITEMS: u32 = 1 << ITEM_BITS;
/// The maximum number of pages of a single record kind.
pub const MAX_PAGES: u32 = 1 << PAGE_BITS;

const ITEM_MASK: u32 = MAX_ITEMS - 1;
const PAGE_MASK: u32 = MAX_PAGES - 1;
const MARK: u32 = 1 << 31;

/// Packed reference into the arena: 20-bit item, 11-bit page and one user mark bit.
///
/// The all-zero handle is the sentinel ("no reference"); slot 0 of page 0 is never handed out.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Handle(u32);

impl Handle {
    pub const NONE: Handle = Handle(0);

    pub const fn new(page: u32, item: u32) -> Self {
        assert!(page < MAX_PAGES, "Page index out of range");
        assert!(item < MAX_ITEMS, "Item index out of range");
        Self((page << ITEM_BITS) | item)
    }

    pub const fn page(self) -> u32 {
        (self.0 >> ITEM_BITS) & PAGE_MASK
    }

    pub const fn item(self) -> u32 {
        self.0 & ITEM_MASK
    }

    /// The 31-bit identifier, without the mark.
    pub const fn id(self) -> u32 {
        self.0 & !MARK
    }

    pub const fn is_none(self) -> bool {
        self.id() == 0
    }

    pub const fn is_some(self) -> bool {
        !self.is_none()
    }

    pub const fn is_marked(self) -> bool {
        self.0 & MARK != 0
    }

    pub const fn marked(self) -> Self {
        Self(self.0 | MARK)
    }

    pub const fn unmarked(self) -> Self {
        Self(self.0 & !MARK)
    }

    /// Same reference, keeping the mark bit of `other`.
    pub const fn with_mark_of(self, other: Handle) -> Self {
        Self(self.id() | (other.0 & MARK))
    }

    pub(crate) const fn raw(self) -> u32 {
        self.0
    }

    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Converts the sentinel into `None`.
    pub fn get(self) -> Option<Handle> {
        if self.is_none() {
            None
        } else {
            Some(self.unmarked())
        }
    }
}

impl Display for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "@null")?;
        } else {
            write!(f, "@{}:{}", self.page(), self.item())?;
        }
        if self.is_marked() {
            write!(f, "*")?;
        }
        Ok(())
    }
}
