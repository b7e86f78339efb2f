use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE_OPTIONS: [usize; 4] = [10, 25, 50, 100];

/// Page lists longer than this are windowed around the current page.
const MAX_UNWINDOWED_PAGES: usize = 7;
const WINDOW_SIBLINGS: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationOptions {
    pub show_page_size_selector: bool,
    pub show_page_info: bool,
    pub page_size_options: Vec<usize>,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            show_page_size_selector: true,
            show_page_info: true,
            page_size_options: DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PageItem {
    Page { number: usize, current: bool },
    Gap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSizeChoice {
    pub size: usize,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub first: usize,
    pub last: usize,
    pub total: usize,
    pub label: String,
}

/// Everything a pagination bar shows. Out-of-range targets are never offered:
/// `previous` is `None` on the first page and `next` is `None` on the last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationView {
    pub current_page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub previous: Option<usize>,
    pub next: Option<usize>,
    pub pages: Vec<PageItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_sizes: Option<Vec<PageSizeChoice>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<PageInfo>,
}

/// User interaction with a rendered pagination bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum PageAction {
    Previous,
    Next,
    Page(usize),
    PageSize(usize),
}

/// Receives page changes forwarded by a pagination bar.
pub trait PageListener {
    fn on_page_change(&mut self, page: usize);
    fn on_page_size_change(&mut self, size: usize);
}

pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_items.div_ceil(page_size)
}

pub fn render(
    current_page: usize,
    total_pages: usize,
    page_size: usize,
    total_items: usize,
    options: &PaginationOptions,
) -> PaginationView {
    let previous = (current_page > 1 && current_page <= total_pages).then(|| current_page - 1);
    let next = (current_page >= 1 && current_page < total_pages).then(|| current_page + 1);

    let page_sizes = options.show_page_size_selector.then(|| {
        let mut sizes = options.page_size_options.clone();
        if page_size > 0 && !sizes.contains(&page_size) {
            sizes.push(page_size);
            sizes.sort_unstable();
        }
        sizes
            .into_iter()
            .map(|size| PageSizeChoice {
                size,
                selected: size == page_size,
            })
            .collect()
    });

    let info = options
        .show_page_info
        .then(|| page_info(current_page, page_size, total_items));

    PaginationView {
        current_page,
        total_pages,
        page_size,
        previous,
        next,
        pages: page_items(current_page, total_pages),
        page_sizes,
        info,
    }
}

fn page_info(current_page: usize, page_size: usize, total_items: usize) -> PageInfo {
    // Range-check before multiplying: both inputs may come straight off the wire.
    let start = current_page
        .checked_sub(1)
        .and_then(|before| before.checked_mul(page_size));
    let (first, last) = match start {
        Some(start) if page_size > 0 && start < total_items => {
            (start + 1, start.saturating_add(page_size).min(total_items))
        }
        _ => (0, 0),
    };
    PageInfo {
        first,
        last,
        total: total_items,
        label: format!("{first}\u{2013}{last} of {total_items}"),
    }
}

fn page_items(current_page: usize, total_pages: usize) -> Vec<PageItem> {
    let page = |number: usize| PageItem::Page {
        number,
        current: number == current_page,
    };

    if total_pages <= MAX_UNWINDOWED_PAGES {
        return (1..=total_pages).map(page).collect();
    }

    // First and last page stay visible; the current page keeps its siblings.
    let anchor = current_page.clamp(1, total_pages);
    let lo = anchor.saturating_sub(WINDOW_SIBLINGS).max(2);
    let hi = anchor.saturating_add(WINDOW_SIBLINGS).min(total_pages - 1);

    let mut items = vec![page(1)];
    if lo > 2 {
        items.push(PageItem::Gap);
    }
    items.extend((lo..=hi).map(page));
    if hi < total_pages - 1 {
        items.push(PageItem::Gap);
    }
    items.push(page(total_pages));
    items
}

impl PaginationView {
    fn offers_page(&self, number: usize) -> bool {
        self.pages
            .iter()
            .any(|p| matches!(p, PageItem::Page { number: n, .. } if *n == number))
    }

    fn offers_page_size(&self, size: usize) -> bool {
        self.page_sizes
            .as_ref()
            .is_some_and(|sizes| sizes.iter().any(|c| c.size == size))
    }

    /// Forwards `action` to `listener` if this view offered it.
    /// Returns whether anything was forwarded.
    pub fn activate<L: PageListener + ?Sized>(&self, action: PageAction, listener: &mut L) -> bool {
        match action {
            PageAction::Previous => match self.previous {
                Some(p) => {
                    listener.on_page_change(p);
                    true
                }
                None => false,
            },
            PageAction::Next => match self.next {
                Some(p) => {
                    listener.on_page_change(p);
                    true
                }
                None => false,
            },
            PageAction::Page(n) if n != self.current_page && self.offers_page(n) => {
                listener.on_page_change(n);
                true
            }
            PageAction::Page(_) => false,
            PageAction::PageSize(size) if size != self.page_size && self.offers_page_size(size) => {
                listener.on_page_size_change(size);
                true
            }
            PageAction::PageSize(_) => false,
        }
    }
}
