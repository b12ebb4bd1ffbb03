use std::num::NonZeroU32;

use cw_protocol::Request;
use cw_sync::RemoteCache;
use cw_types::{ItemStack, ResourceCatalog, ResourceType, Snapshot};
use tracing::debug;

use crate::layout::{Rect, Viewport, LIST_TOP, ROW_HEIGHT, SCROLL_STEP};

/// One entry of the filtered, sorted warehouse list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    /// 1-based position in the filtered list.
    pub ordinal: usize,
    pub resource: ResourceType,
    pub quantity: u64,
    pub display_name: String,
}

impl Row {
    /// Row text as drawn: `"<quantity> x <name>"`.
    pub fn label(&self) -> String {
        format!("{} x {}", self.quantity, self.display_name)
    }
}

/// A row that intersects the list viewport, with its top edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisibleRow {
    pub row: Row,
    pub y: i32,
}

/// Everything needed to draw the list for one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub rows: Vec<VisibleRow>,
    pub total_rows: usize,
    pub scroll_offset: i32,
    pub max_scroll: i32,
    /// Where the filter text field is drawn.
    pub search_box: Rect,
    pub footer: String,
    pub footer_y: i32,
}

/// Filter text plus scroll position over a [`RemoteCache`].
///
/// Rows are recomputed from the cache on every call; nothing is cached
/// between frames.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListView {
    filter: String,
    scroll_offset: i32,
}

impl ListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn scroll_offset(&self) -> i32 {
        self.scroll_offset
    }

    /// Replace the filter text. Editing the filter jumps back to the top.
    pub fn set_filter(&mut self, text: impl Into<String>) {
        self.filter = text.into();
        self.scroll_offset = 0;
    }

    /// Stocked entries whose display name contains the filter text
    /// (case-insensitive), sorted by display name.
    pub fn rows<C>(&self, snapshot: Option<&Snapshot>, catalog: &C) -> Vec<Row>
    where
        C: ResourceCatalog + ?Sized,
    {
        let Some(snapshot) = snapshot else {
            return Vec::new();
        };
        let needle = self.filter.to_lowercase();
        let mut rows: Vec<(String, &ResourceType, u64)> = snapshot
            .stocked()
            .map(|(resource, quantity)| (catalog.display_name(resource), resource, quantity))
            .filter(|(name, _, _)| name.to_lowercase().contains(&needle))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        rows.into_iter()
            .enumerate()
            .map(|(i, (display_name, resource, quantity))| Row {
                ordinal: i + 1,
                resource: resource.clone(),
                quantity,
                display_name,
            })
            .collect()
    }

    /// Furthest the list can scroll for `row_count` rows.
    pub fn max_scroll(row_count: usize, viewport: Viewport) -> i32 {
        let content = i64::try_from(row_count)
            .unwrap_or(i64::MAX)
            .saturating_mul(i64::from(ROW_HEIGHT));
        let max = (content - i64::from(viewport.list_height())).max(0);
        i32::try_from(max).unwrap_or(i32::MAX)
    }

    /// Pull the scroll offset back into `[0, max_scroll]`.
    pub fn clamp(&mut self, row_count: usize, viewport: Viewport) {
        let max = Self::max_scroll(row_count, viewport);
        self.scroll_offset = self.scroll_offset.clamp(0, max);
    }

    /// Clamp, then lay out the rows that intersect the viewport.
    pub fn render<C>(&mut self, cache: &RemoteCache, catalog: &C, viewport: Viewport) -> Frame
    where
        C: ResourceCatalog + ?Sized,
    {
        let rows = self.rows(cache.snapshot(), catalog);
        self.clamp(rows.len(), viewport);
        let list_bottom = viewport.list_bottom();
        let total_rows = rows.len();

        let visible = rows
            .into_iter()
            .enumerate()
            .filter_map(|(i, row)| {
                let y = self.row_top(i);
                (y + ROW_HEIGHT > LIST_TOP && y < list_bottom).then_some(VisibleRow { row, y })
            })
            .collect();

        Frame {
            rows: visible,
            total_rows,
            scroll_offset: self.scroll_offset,
            max_scroll: Self::max_scroll(total_rows, viewport),
            search_box: viewport.search_box(),
            footer: footer(cache),
            footer_y: viewport.footer_y(),
        }
    }

    /// Apply a wheel movement of `notches` (positive scrolls up). Only the
    /// list half of the screen scrolls; returns whether the event was used.
    pub fn scroll<C>(
        &mut self,
        pointer_x: f64,
        notches: f64,
        cache: &RemoteCache,
        catalog: &C,
        viewport: Viewport,
    ) -> bool
    where
        C: ResourceCatalog + ?Sized,
    {
        if pointer_x >= f64::from(viewport.width) / 2.0 {
            return false;
        }
        let row_count = self.rows(cache.snapshot(), catalog).len();
        let max = f64::from(Self::max_scroll(row_count, viewport));
        let target = f64::from(self.scroll_offset) - notches * SCROLL_STEP;
        self.scroll_offset = target.clamp(0.0, max) as i32;
        true
    }

    /// Map a click to the request it triggers, if any.
    ///
    /// A row click withdraws one unit, or a full stack when `modifier` is
    /// held. An inventory slot click deposits one unit, or the whole slot.
    /// The "Store All" button deposits everything.
    #[allow(clippy::too_many_arguments)]
    pub fn click<C>(
        &self,
        x: f64,
        y: f64,
        modifier: bool,
        cache: &RemoteCache,
        inventory: &[Option<ItemStack>],
        catalog: &C,
        viewport: Viewport,
    ) -> Option<Request>
    where
        C: ResourceCatalog + ?Sized,
    {
        let request = self
            .click_list(x, y, modifier, cache, catalog, viewport)
            .or_else(|| click_inventory(x, y, modifier, inventory, viewport))
            .or_else(|| {
                viewport
                    .store_all_button()
                    .contains(x, y)
                    .then_some(Request::DepositAll)
            });
        if let Some(request) = &request {
            debug!(?request, "click mapped to request");
        }
        request
    }

    fn click_list<C>(
        &self,
        x: f64,
        y: f64,
        modifier: bool,
        cache: &RemoteCache,
        catalog: &C,
        viewport: Viewport,
    ) -> Option<Request>
    where
        C: ResourceCatalog + ?Sized,
    {
        let in_list = x < f64::from(viewport.divider_x())
            && y >= f64::from(LIST_TOP)
            && y <= f64::from(viewport.list_bottom());
        if !in_list {
            return None;
        }
        let rows = self.rows(cache.snapshot(), catalog);
        let (_, row) = rows.into_iter().enumerate().find(|(i, _)| {
            let top = f64::from(self.row_top(*i));
            y >= top && y < top + f64::from(ROW_HEIGHT)
        })?;

        let count = if modifier {
            let max_stack = u64::from(catalog.max_stack_size(&row.resource));
            u32::try_from(row.quantity.min(max_stack)).unwrap_or(u32::MAX)
        } else {
            1
        };
        Some(Request::WithdrawByType {
            resource: row.resource,
            count: NonZeroU32::new(count)?,
        })
    }

    fn row_top(&self, index: usize) -> i32 {
        let index = i32::try_from(index).unwrap_or(i32::MAX);
        LIST_TOP
            .saturating_add(index.saturating_mul(ROW_HEIGHT))
            .saturating_sub(self.scroll_offset)
    }
}

fn click_inventory(
    x: f64,
    y: f64,
    modifier: bool,
    inventory: &[Option<ItemStack>],
    viewport: Viewport,
) -> Option<Request> {
    let slot = viewport.slot_at(x, y)?;
    let stack = inventory.get(slot)?.as_ref().filter(|s| !s.is_empty())?;
    let count = if modifier { stack.quantity } else { 1 };
    Some(Request::DepositFromSlot {
        slot,
        count: NonZeroU32::new(count)?,
    })
}

/// `"Updated: yyyy-mm-dd HH:MM:SS"` in local time, or `"Updated: Never"`
/// before the first push.
pub fn footer(cache: &RemoteCache) -> String {
    match cache.last_updated() {
        Some(ts) if ts.as_millis() > 0 => format!("Updated: {}", ts.format_local()),
        _ => "Updated: Never".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use cw_types::{StaticCatalog, Timestamp};
    use proptest::prelude::*;

    use super::*;

    const SCREEN: Viewport = Viewport::new(400, 300);

    fn rt(id: &str) -> ResourceType {
        ResourceType::new(id).unwrap()
    }

    fn cache_with(entries: &[(&str, u64)]) -> RemoteCache {
        let items: BTreeMap<_, _> = entries.iter().map(|(id, q)| (rt(id), *q)).collect();
        let mut cache = RemoteCache::new();
        cache.apply(Snapshot::new(items, Timestamp::from_millis(1_700_000_000_000)));
        cache
    }

    fn names(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r.display_name.as_str()).collect()
    }

    #[test]
    fn empty_filter_lists_stocked_entries_by_name() {
        let catalog = StaticCatalog::builtin();
        let cache = cache_with(&[
            ("minecraft:wheat", 64),
            ("minecraft:stone", 0),
            ("minecraft:diamond", 3),
            ("minecraft:coal", 12),
        ]);
        let view = ListView::new();
        let rows = view.rows(cache.snapshot(), &catalog);
        assert_eq!(names(&rows), vec!["Coal", "Diamond", "Wheat"]);
        assert_eq!(rows[2].ordinal, 3);
        assert_eq!(rows[2].label(), "64 x Wheat");
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let catalog = StaticCatalog::builtin();
        let cache = cache_with(&[
            ("minecraft:iron_ingot", 5),
            ("minecraft:gold_ingot", 7),
            ("minecraft:dirt", 1),
        ]);
        let mut view = ListView::new();
        view.set_filter("INGOT");
        let rows = view.rows(cache.snapshot(), &catalog);
        assert_eq!(names(&rows), vec!["Gold Ingot", "Iron Ingot"]);
        assert_eq!(rows[0].ordinal, 1);
    }

    #[test]
    fn no_snapshot_means_no_rows() {
        let catalog = StaticCatalog::builtin();
        assert!(ListView::new().rows(None, &catalog).is_empty());
        assert_eq!(footer(&RemoteCache::new()), "Updated: Never");
    }

    #[test]
    fn footer_shows_local_time() {
        let cache = cache_with(&[]);
        let text = footer(&cache);
        assert!(text.starts_with("Updated: "));
        assert_eq!(text.len(), "Updated: 2023-11-14 22:13:20".len());
    }

    fn many_items() -> RemoteCache {
        let ids = [
            "minecraft:wheat",
            "minecraft:stone",
            "minecraft:cobblestone",
            "minecraft:dirt",
            "minecraft:oak_log",
            "minecraft:iron_ingot",
            "minecraft:gold_ingot",
            "minecraft:diamond",
            "minecraft:coal",
            "minecraft:redstone",
            "minecraft:egg",
            "minecraft:ender_pearl",
            "minecraft:snowball",
        ];
        let entries: Vec<(&str, u64)> = ids.iter().map(|id| (*id, 5)).collect();
        cache_with(&entries)
    }

    #[test]
    fn render_skips_rows_outside_viewport() {
        let catalog = StaticCatalog::builtin();
        let cache = many_items();
        let mut view = ListView::new();

        let frame = view.render(&cache, &catalog, SCREEN);
        // 13 rows of 20px against a 190px viewport.
        assert_eq!(frame.total_rows, 13);
        assert_eq!(frame.max_scroll, 70);
        assert_eq!(frame.rows.len(), 10);
        assert_eq!(frame.rows[0].y, LIST_TOP);
        assert_eq!(frame.search_box, Rect::new(20, 40, 160, 20));
        assert_eq!(frame.footer_y, 280);
        assert!(frame.footer.starts_with("Updated: "));

        assert!(view.scroll(10.0, -1.5, &cache, &catalog, SCREEN));
        let frame = view.render(&cache, &catalog, SCREEN);
        assert_eq!(frame.scroll_offset, 30);
        // The first row is scrolled fully out; the second is partly visible.
        assert_eq!(frame.rows[0].row.ordinal, 2);
        assert_eq!(frame.rows[0].y, LIST_TOP - 10);
    }

    #[test]
    fn narrowing_filter_snaps_scroll_back() {
        let catalog = StaticCatalog::builtin();
        let cache = many_items();
        let mut view = ListView::new();
        view.scroll(10.0, -10.0, &cache, &catalog, SCREEN);
        assert_eq!(view.scroll_offset(), 70);

        // A filter typed elsewhere resets to the top.
        view.set_filter("ingot");
        assert_eq!(view.scroll_offset(), 0);

        // A shrinking cache clamps on the next render.
        let mut view = ListView::new();
        view.scroll(10.0, -10.0, &cache, &catalog, SCREEN);
        let small = cache_with(&[("minecraft:wheat", 1)]);
        let frame = view.render(&small, &catalog, SCREEN);
        assert_eq!(frame.scroll_offset, 0);
    }

    #[test]
    fn scroll_on_inventory_half_is_ignored() {
        let catalog = StaticCatalog::builtin();
        let cache = many_items();
        let mut view = ListView::new();
        assert!(!view.scroll(300.0, -1.0, &cache, &catalog, SCREEN));
        assert_eq!(view.scroll_offset(), 0);
    }

    #[test]
    fn row_click_withdraws_one_or_a_stack() {
        let catalog = StaticCatalog::builtin();
        let cache = cache_with(&[("minecraft:wheat", 100), ("minecraft:egg", 5)]);
        let view = ListView::new();
        // Rows: Egg at 65..85, Wheat at 85..105.
        assert_eq!(
            view.click(30.0, 90.0, false, &cache, &[], &catalog, SCREEN),
            Some(Request::WithdrawByType {
                resource: rt("minecraft:wheat"),
                count: NonZeroU32::new(1).unwrap(),
            })
        );
        assert_eq!(
            view.click(30.0, 90.0, true, &cache, &[], &catalog, SCREEN),
            Some(Request::WithdrawByType {
                resource: rt("minecraft:wheat"),
                count: NonZeroU32::new(64).unwrap(),
            })
        );
        assert_eq!(
            view.click(30.0, 70.0, true, &cache, &[], &catalog, SCREEN),
            Some(Request::WithdrawByType {
                resource: rt("minecraft:egg"),
                count: NonZeroU32::new(5).unwrap(),
            })
        );
        assert_eq!(view.click(30.0, 150.0, false, &cache, &[], &catalog, SCREEN), None);
    }

    #[test]
    fn slot_click_deposits_one_or_the_whole_slot() {
        let catalog = StaticCatalog::builtin();
        let cache = RemoteCache::new();
        let mut inventory = vec![None; 36];
        inventory[9] = Some(ItemStack::simple(rt("minecraft:stone"), 40));
        let view = ListView::new();

        assert_eq!(
            view.click(221.0, 41.0, false, &cache, &inventory, &catalog, SCREEN),
            Some(Request::DepositFromSlot { slot: 9, count: NonZeroU32::new(1).unwrap() })
        );
        assert_eq!(
            view.click(221.0, 41.0, true, &cache, &inventory, &catalog, SCREEN),
            Some(Request::DepositFromSlot { slot: 9, count: NonZeroU32::new(40).unwrap() })
        );
        // Empty slot.
        assert_eq!(view.click(239.0, 41.0, true, &cache, &inventory, &catalog, SCREEN), None);
    }

    #[test]
    fn store_all_button() {
        let catalog = StaticCatalog::builtin();
        let view = ListView::new();
        assert_eq!(
            view.click(260.0, 260.0, false, &RemoteCache::new(), &[], &catalog, SCREEN),
            Some(Request::DepositAll)
        );
    }

    proptest! {
        #[test]
        fn scroll_offset_stays_clamped(
            rows in 0usize..200,
            height in 0i32..600,
            wheel in prop::collection::vec(-50.0f64..50.0, 0..20),
            start in -1000i32..100_000,
        ) {
            let viewport = Viewport::new(400, height);
            let mut view = ListView { filter: String::new(), scroll_offset: start };
            view.clamp(rows, viewport);
            let max = ListView::max_scroll(rows, viewport);
            prop_assert!(view.scroll_offset() >= 0);
            prop_assert!(view.scroll_offset() <= max);
            prop_assert_eq!(
                max,
                (rows as i32 * ROW_HEIGHT - viewport.list_height()).max(0)
            );

            let catalog = StaticCatalog::builtin();
            let cache = many_items();
            let count = view.rows(cache.snapshot(), &catalog).len();
            let max = ListView::max_scroll(count, viewport);
            for notches in wheel {
                view.scroll(0.0, notches, &cache, &catalog, viewport);
                prop_assert!(view.scroll_offset() >= 0 && view.scroll_offset() <= max);
            }
        }
    }
}
