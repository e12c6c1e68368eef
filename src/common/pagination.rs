// src/common/pagination.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

// Parâmetros de listagem que todos os endpoints de lista aceitam.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search: Option<String>,
}

impl ListParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.page_size()
    }

    // Termo de busca normalizado para LIKE ('%termo%')
    pub fn search_like(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s))
    }
}

// O envelope de paginação que o console espera:
// {total, page_size, current_page, total_pages, results}
#[derive(Debug, Serialize, ToSchema)]
pub struct Paginated<T> {
    pub total: i64,
    pub page_size: i64,
    pub current_page: i64,
    pub total_pages: i64,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(results: Vec<T>, total: i64, params: &ListParams) -> Self {
        let page_size = params.page_size();
        Self {
            total,
            page_size,
            current_page: params.page(),
            total_pages: total_pages(total, page_size),
            results,
        }
    }
}

fn total_pages(total: i64, page_size: i64) -> i64 {
    if total == 0 {
        0
    } else {
        (total + page_size - 1) / page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_e_limites() {
        let p = ListParams::default();
        assert_eq!(p.page(), 1);
        assert_eq!(p.page_size(), 20);
        assert_eq!(p.offset(), 0);

        let p = ListParams { page: Some(0), page_size: Some(10_000), search: None };
        assert_eq!(p.page(), 1);
        assert_eq!(p.page_size(), 100);
    }

    #[test]
    fn calculo_de_total_pages() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
    }

    #[test]
    fn busca_vazia_vira_none() {
        let p = ListParams { page: None, page_size: None, search: Some("   ".into()) };
        assert_eq!(p.search_like(), None);

        let p = ListParams { page: None, page_size: None, search: Some("acme".into()) };
        assert_eq!(p.search_like(), Some("%acme%".into()));
    }
}
