//! Tile decomposition of the output image.
//!
//! The image is cut into square tiles that are traced independently, on
//! any worker. Tiles along the right and top edges are clipped to the
//! image.

/// A rectangular region of the image to trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// X coordinate of the tile's first column
    pub x: u32,
    /// Y coordinate of the tile's first row (row 0 is the bottom of the image)
    pub y: u32,
    /// Width of the tile in pixels
    pub width: u32,
    /// Height of the tile in pixels
    pub height: u32,
    /// Index of this tile in the trace order
    pub index: usize,
}

impl Tile {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    /// Get the total number of pixels in this tile.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Image coordinates of every pixel in the tile, row by row.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y + self.height).flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }
}

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_DIMENSION: u32 = 16;

/// Cut a `width` x `height` image into tiles of at most `dimension` pixels
/// per side, sorted in spiral order from the image center.
///
/// A zero `dimension` yields no tiles.
pub fn generate_tiles(width: u32, height: u32, dimension: u32) -> Vec<Tile> {
    let mut tiles = Vec::new();
    if dimension == 0 {
        return tiles;
    }

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let tw = dimension.min(width - x);
            let th = dimension.min(height - y);
            tiles.push(Tile::new(x, y, tw, th, tiles.len()));
            x += dimension;
        }
        y += dimension;
    }

    sort_spiral(&mut tiles, width, height);

    // Index is the trace order
    for (i, tile) in tiles.iter_mut().enumerate() {
        tile.index = i;
    }

    tiles
}

/// Sort tiles by distance from the image center, nearest first.
///
/// The sort is stable, so equidistant tiles keep their row-major order.
fn sort_spiral(tiles: &mut [Tile], width: u32, height: u32) {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;

    let distance = |t: &Tile| {
        let cx = t.x as f32 + t.width as f32 / 2.0;
        let cy = t.y as f32 + t.height as f32 / 2.0;
        (cx - center_x).powi(2) + (cy - center_y).powi(2)
    };

    tiles.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
}
