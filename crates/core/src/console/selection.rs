use std::collections::HashSet;

use crate::models::ResourceRecord;

/// A paginated, multi-selectable list of resources.
///
/// `current_page` is always a valid page for the current item count (or 0 when
/// empty) and `cursor` always indexes a record on that page.
#[derive(Debug, Clone)]
pub struct PaginatedSelection {
    items: Vec<ResourceRecord>,
    page_size: usize,
    current_page: usize,
    cursor: usize,
    selected: usize,
}

impl PaginatedSelection {
    /// Create an empty selection. A zero page size is treated as 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            items: Vec::new(),
            page_size: page_size.max(1),
            current_page: 0,
            cursor: 0,
            selected: 0,
        }
    }

    /// Replace all items, resetting page, cursor and every selection flag.
    pub fn load_items(&mut self, items: Vec<ResourceRecord>) {
        self.items = items;
        for item in &mut self.items {
            item.selected = false;
        }
        self.selected = 0;
        self.reset_position();
    }

    /// Replace all items, carrying selection flags over for ids present in both lists.
    ///
    /// The page and cursor are kept where possible and clamped to the new bounds.
    pub fn merge_items(&mut self, items: Vec<ResourceRecord>) {
        let previously_selected: HashSet<String> = self
            .items
            .iter()
            .filter(|item| item.selected)
            .map(|item| item.id.clone())
            .collect();
        self.items = items;
        for item in &mut self.items {
            item.selected = previously_selected.contains(&item.id);
        }
        self.selected = self.items.iter().filter(|item| item.selected).count();
        self.clamp_position();
    }

    /// Move back to the first row of the first page.
    pub fn reset_position(&mut self) {
        self.current_page = 0;
        self.cursor = 0;
    }

    /// Walk the cursor by `delta` rows across the whole list, crossing page
    /// boundaries as needed and clamping at either end.
    pub fn move_cursor(&mut self, delta: isize) {
        if self.items.is_empty() {
            self.reset_position();
            return;
        }
        let last = self.items.len() - 1;
        let target = self
            .absolute_index()
            .saturating_add_signed(delta)
            .min(last);
        self.current_page = target / self.page_size;
        self.cursor = target % self.page_size;
    }

    /// Move by `delta` pages within bounds, then clamp the cursor to the new page.
    pub fn goto_page(&mut self, delta: isize) {
        let total = self.total_pages();
        if total == 0 {
            self.reset_position();
            return;
        }
        self.current_page = self
            .current_page
            .saturating_add_signed(delta)
            .min(total - 1);
        self.clamp_cursor();
    }

    /// Flip the selection flag on the record under the cursor.
    ///
    /// Returns the new flag, or `None` when there is no record there.
    pub fn toggle_selection_at_cursor(&mut self) -> Option<bool> {
        let index = self.absolute_index();
        let item = self.items.get_mut(index)?;
        item.selected = !item.selected;
        if item.selected {
            self.selected += 1;
        } else {
            self.selected -= 1;
        }
        Some(item.selected)
    }

    /// Clear the flag on every record whose id is in `ids`.
    pub fn deselect<'a>(&mut self, ids: impl IntoIterator<Item = &'a String>) {
        let ids: HashSet<&String> = ids.into_iter().collect();
        for item in &mut self.items {
            if item.selected && ids.contains(&item.id) {
                item.selected = false;
                self.selected -= 1;
            }
        }
    }

    /// Every selected record across all pages, in list order.
    pub fn selected_records(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.items.iter().filter(|item| item.selected)
    }

    /// Number of selected records.
    pub fn selected_count(&self) -> usize {
        self.selected
    }

    /// Number of records.
    pub fn total_count(&self) -> usize {
        self.items.len()
    }

    /// `ceil(len / page_size)`, or 0 when empty.
    pub fn total_pages(&self) -> usize {
        self.items.len().div_ceil(self.page_size)
    }

    /// Zero-based page currently shown.
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Row of the cursor within the current page.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Configured rows per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Records visible on the current page.
    pub fn page_items(&self) -> &[ResourceRecord] {
        let start = (self.current_page * self.page_size).min(self.items.len());
        let end = (start + self.page_size).min(self.items.len());
        &self.items[start..end]
    }

    /// Record under the cursor, if any.
    pub fn current_record(&self) -> Option<&ResourceRecord> {
        self.items.get(self.absolute_index())
    }

    /// All records in list order.
    pub fn items(&self) -> &[ResourceRecord] {
        &self.items
    }

    fn absolute_index(&self) -> usize {
        self.current_page * self.page_size + self.cursor
    }

    fn clamp_cursor(&mut self) {
        let visible = self.page_items().len();
        self.cursor = self.cursor.min(visible.saturating_sub(1));
    }

    fn clamp_position(&mut self) {
        let total = self.total_pages();
        self.current_page = self.current_page.min(total.saturating_sub(1));
        self.clamp_cursor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(count: usize) -> Vec<ResourceRecord> {
        (0..count)
            .map(|n| ResourceRecord::new(format!("id-{n}"), format!("item {n}"), ""))
            .collect()
    }

    fn loaded(count: usize, page_size: usize) -> PaginatedSelection {
        let mut selection = PaginatedSelection::new(page_size);
        selection.load_items(records(count));
        selection
    }

    fn assert_in_bounds(selection: &PaginatedSelection) {
        let pages = selection.total_pages();
        if pages == 0 {
            assert_eq!(selection.current_page(), 0);
            assert_eq!(selection.cursor(), 0);
            assert!(selection.current_record().is_none());
        } else {
            assert!(selection.current_page() < pages);
            assert!(selection.cursor() < selection.page_items().len());
            assert!(selection.current_record().is_some());
        }
    }

    #[test]
    fn page_bounds_hold_under_any_navigation() {
        let moves: [(bool, isize); 10] = [
            (true, 1),
            (false, 1),
            (true, 7),
            (false, -1),
            (true, -3),
            (false, 5),
            (true, 100),
            (false, -9),
            (true, -100),
            (false, 2),
        ];
        for page_size in 1..=7 {
            for len in 0..=23 {
                let mut selection = loaded(len, page_size);
                assert_eq!(selection.total_pages(), len.div_ceil(page_size));
                for (by_row, delta) in moves {
                    if by_row {
                        selection.move_cursor(delta);
                    } else {
                        selection.goto_page(delta);
                    }
                    assert_in_bounds(&selection);
                }
            }
        }
    }

    #[test]
    fn cursor_walk_crosses_page_boundaries() {
        let mut selection = loaded(25, 10);
        assert_eq!(selection.total_pages(), 3);

        selection.move_cursor(9);
        assert_eq!((selection.current_page(), selection.cursor()), (0, 9));

        selection.move_cursor(1);
        assert_eq!((selection.current_page(), selection.cursor()), (1, 0));

        selection.move_cursor(-1);
        assert_eq!((selection.current_page(), selection.cursor()), (0, 9));
    }

    #[test]
    fn cursor_clamps_at_list_ends() {
        let mut selection = loaded(25, 10);
        selection.move_cursor(-1);
        assert_eq!((selection.current_page(), selection.cursor()), (0, 0));

        selection.move_cursor(1_000);
        assert_eq!((selection.current_page(), selection.cursor()), (2, 4));
        selection.move_cursor(1);
        assert_eq!((selection.current_page(), selection.cursor()), (2, 4));
        assert_eq!(selection.current_record().map(|r| r.id.as_str()), Some("id-24"));
    }

    #[test]
    fn page_jump_adjusts_cursor_for_shorter_last_page() {
        let mut selection = loaded(25, 10);
        selection.move_cursor(8);
        selection.goto_page(1);
        assert_eq!((selection.current_page(), selection.cursor()), (1, 8));
        selection.goto_page(1);
        assert_eq!((selection.current_page(), selection.cursor()), (2, 4));
        selection.goto_page(1);
        assert_eq!(selection.current_page(), 2);
        selection.goto_page(-5);
        assert_eq!((selection.current_page(), selection.cursor()), (0, 4));
    }

    #[test]
    fn selection_count_tracks_toggles() {
        let mut selection = loaded(5, 2);
        selection.toggle_selection_at_cursor();
        selection.move_cursor(1);
        selection.toggle_selection_at_cursor();
        selection.move_cursor(1);
        selection.toggle_selection_at_cursor();
        assert_eq!(selection.selected_count(), 3);

        selection.move_cursor(-1);
        assert_eq!(selection.toggle_selection_at_cursor(), Some(false));
        assert_eq!(selection.selected_count(), 2);

        let ids: Vec<&str> = selection.selected_records().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["id-0", "id-2"]);
    }

    #[test]
    fn toggle_on_empty_list_is_noop() {
        let mut selection = PaginatedSelection::new(10);
        assert_eq!(selection.toggle_selection_at_cursor(), None);
        assert_eq!(selection.selected_count(), 0);
    }

    #[test]
    fn load_items_clears_flags_even_for_same_ids() {
        let mut selection = loaded(4, 10);
        selection.move_cursor(2);
        selection.toggle_selection_at_cursor();
        selection.goto_page(0);

        let mut reordered = records(4);
        reordered.reverse();
        selection.load_items(reordered);
        assert_eq!(selection.selected_count(), 0);
        assert_eq!(selection.selected_records().count(), 0);
        assert_eq!((selection.current_page(), selection.cursor()), (0, 0));
    }

    #[test]
    fn reload_without_item_drops_it() {
        let mut selection = loaded(3, 10);
        selection.move_cursor(1);
        selection.toggle_selection_at_cursor();

        let remaining: Vec<ResourceRecord> = records(3)
            .into_iter()
            .filter(|record| record.id != "id-1")
            .collect();
        selection.load_items(remaining);
        assert!(selection.items().iter().all(|record| record.id != "id-1"));
        assert_eq!(selection.selected_count(), 0);
    }

    #[test]
    fn merge_keeps_flags_by_identity() {
        let mut selection = loaded(12, 5);
        selection.toggle_selection_at_cursor();
        selection.move_cursor(11);
        selection.toggle_selection_at_cursor();
        assert_eq!(selection.selected_count(), 2);

        let mut next = records(12);
        next.retain(|record| record.id != "id-0");
        next.reverse();
        selection.merge_items(next);

        assert_eq!(selection.total_count(), 11);
        assert_eq!(selection.selected_count(), 1);
        let ids: Vec<&str> = selection.selected_records().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["id-11"]);
        assert_eq!(selection.current_page(), 2);
        assert_eq!(selection.cursor(), 0);
    }

    #[test]
    fn deselect_only_touches_listed_ids() {
        let mut selection = loaded(3, 10);
        for _ in 0..3 {
            selection.toggle_selection_at_cursor();
            selection.move_cursor(1);
        }
        selection.deselect(&["id-0".to_string(), "missing".to_string()]);
        assert_eq!(selection.selected_count(), 2);
        selection.deselect(&["id-0".to_string()]);
        assert_eq!(selection.selected_count(), 2);
    }
}
