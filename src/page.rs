//! Page requests and page results shared by every list view.

use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 2000;
/// Highest zero-based page index accepted from a request.
pub const MAX_PAGE_NUMBER: u32 = i32::MAX as u32;

/// Raw `page`, `size` and `sort` query parameters.
///
/// Values are kept as strings so a malformed number falls back to the
/// default instead of rejecting the whole request.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub size: Option<String>,
    pub sort: Option<String>,
}

impl PageParams {
    pub fn to_pageable(&self, default_size: u32) -> Pageable {
        let page = self
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(0)
            .clamp(0, MAX_PAGE_NUMBER as i64) as u32;

        let size = match self.size.as_deref().and_then(|s| s.trim().parse::<i64>().ok()) {
            Some(s) if s >= 1 => s.min(MAX_PAGE_SIZE as i64) as u32,
            _ => default_size,
        };

        let sort = self.sort.as_deref().and_then(Sort::parse);

        Pageable { page, size, sort }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub property: String,
    pub direction: Direction,
}

impl Sort {
    /// Parse `"property"` or `"property,asc|desc"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(',').map(str::trim);
        let property = parts.next().filter(|p| !p.is_empty())?;
        let direction = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            Some("desc") => Direction::Desc,
            _ => Direction::Asc,
        };

        Some(Self {
            property: property.to_string(),
            direction,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pageable {
    pub page: u32,
    pub size: u32,
    pub sort: Option<Sort>,
}

impl Default for Pageable {
    fn default() -> Self {
        Self::of(0, DEFAULT_PAGE_SIZE)
    }
}

impl Pageable {
    pub fn of(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.max(1),
            sort: None,
        }
    }

    pub fn offset(&self) -> i64 {
        self.page as i64 * self.size as i64
    }

    pub fn limit(&self) -> i64 {
        self.size as i64
    }

    /// Build an `ORDER BY` body from the requested sort.
    ///
    /// `allowed` maps public property names to SQL columns; anything not in it
    /// falls back to `default`, so the result is always safe to splice into SQL.
    pub fn order_by(&self, allowed: &[(&str, &str)], default: &str) -> String {
        self.sort
            .as_ref()
            .and_then(|sort| {
                allowed
                    .iter()
                    .find(|(property, _)| *property == sort.property)
                    .map(|(_, column)| format!("{} {}", column, sort.direction.as_sql()))
            })
            .unwrap_or_else(|| default.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub total_elements: i64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: &Pageable, total_elements: i64) -> Self {
        Self {
            content,
            number: pageable.page,
            size: pageable.size,
            total_elements,
        }
    }

    pub fn empty(pageable: &Pageable) -> Self {
        Self::new(Vec::new(), pageable, 0)
    }

    pub fn total_pages(&self) -> u32 {
        if self.size == 0 || self.total_elements <= 0 {
            return 0;
        }
        let size = self.size as i64;
        ((self.total_elements + size - 1) / size) as u32
    }

    pub fn has_next(&self) -> bool {
        self.number.saturating_add(1) < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn next_number(&self) -> u32 {
        self.number.saturating_add(1)
    }

    pub fn previous_number(&self) -> u32 {
        self.number.saturating_sub(1)
    }

    /// One-based page number for display.
    pub fn display_number(&self) -> u32 {
        self.number.saturating_add(1)
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
        }
    }
}
