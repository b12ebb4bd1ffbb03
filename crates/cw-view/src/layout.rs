//! Screen geometry shared by rendering and hit-testing.
//!
//! The screen is split at `width / 2`: the warehouse list on the left, the
//! mirrored inventory grid on the right.

/// Height of one warehouse row.
pub const ROW_HEIGHT: i32 = 20;
/// Top edge of the list viewport.
pub const LIST_TOP: i32 = 65;
/// Gap between the list viewport and the bottom of the screen.
pub const LIST_BOTTOM_MARGIN: i32 = 45;
/// Pixels scrolled per wheel notch.
pub const SCROLL_STEP: f64 = 20.0;

/// Offset of the inventory grid from the divider.
pub const GRID_OFFSET_X: i32 = 20;
pub const GRID_TOP: i32 = 40;
/// Distance between neighbouring slot origins.
pub const SLOT_PITCH: i32 = 18;
/// Clickable size of one slot.
pub const SLOT_SIZE: i32 = 16;
pub const GRID_COLUMNS: usize = 9;
pub const MAIN_ROWS: usize = 3;
/// Extra gap between the main grid and the hotbar row.
pub const HOTBAR_GAP: i32 = 10;

pub const BUTTON_WIDTH: i32 = 100;
pub const BUTTON_HEIGHT: i32 = 20;

/// An axis-aligned rectangle; `contains` is half-open on the far edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= f64::from(self.x)
            && px < f64::from(self.x + self.width)
            && py >= f64::from(self.y)
            && py < f64::from(self.y + self.height)
    }
}

/// Size of the screen the view is laid out on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn divider_x(&self) -> i32 {
        self.width / 2
    }

    /// Bottom edge of the list viewport.
    pub fn list_bottom(&self) -> i32 {
        self.height - LIST_BOTTOM_MARGIN
    }

    /// Visible height of the list, never negative.
    pub fn list_height(&self) -> i32 {
        (self.list_bottom() - LIST_TOP).max(0)
    }

    pub fn search_box(&self) -> Rect {
        Rect::new(20, 40, self.divider_x() - 40, 20)
    }

    pub fn store_all_button(&self) -> Rect {
        let divider = self.divider_x();
        Rect::new(
            divider + (divider - BUTTON_WIDTH) / 2,
            self.height - 45,
            BUTTON_WIDTH,
            BUTTON_HEIGHT,
        )
    }

    /// Baseline of the "Updated: ..." label.
    pub fn footer_y(&self) -> i32 {
        self.height - 20
    }

    pub fn grid_origin(&self) -> (i32, i32) {
        (self.divider_x() + GRID_OFFSET_X, GRID_TOP)
    }

    /// Top-left corner of inventory slot `slot`: slots 9..36 fill the three
    /// main rows, slots 0..9 the hotbar below them.
    pub fn slot_origin(&self, slot: usize) -> Option<(i32, i32)> {
        let (x0, y0) = self.grid_origin();
        let slots_in_grid = GRID_COLUMNS * (MAIN_ROWS + 1);
        if slot >= slots_in_grid {
            return None;
        }
        if slot < GRID_COLUMNS {
            let hotbar_y = y0 + MAIN_ROWS as i32 * SLOT_PITCH + HOTBAR_GAP;
            return Some((x0 + slot as i32 * SLOT_PITCH, hotbar_y));
        }
        let main = slot - GRID_COLUMNS;
        let row = (main / GRID_COLUMNS) as i32;
        let col = (main % GRID_COLUMNS) as i32;
        Some((x0 + col * SLOT_PITCH, y0 + row * SLOT_PITCH))
    }

    pub fn slot_rect(&self, slot: usize) -> Option<Rect> {
        self.slot_origin(slot)
            .map(|(x, y)| Rect::new(x, y, SLOT_SIZE, SLOT_SIZE))
    }

    /// Inventory slot under the pointer, if any.
    pub fn slot_at(&self, px: f64, py: f64) -> Option<usize> {
        if px < f64::from(self.divider_x() + GRID_OFFSET_X) {
            return None;
        }
        // Main rows first, then the hotbar.
        (GRID_COLUMNS..GRID_COLUMNS * (MAIN_ROWS + 1))
            .chain(0..GRID_COLUMNS)
            .find(|&slot| self.slot_rect(slot).is_some_and(|r| r.contains(px, py)))
    }
}
