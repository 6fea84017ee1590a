//! Maze model
//!
//! Owns the static wall segments and the floor tile grid, and answers
//! collision and floor-lookup queries. Immutable after construction; a
//! malformed description fails with a configuration error before the
//! first tick.

use crate::config::MazeConfig;
use crate::error::{Error, Result};
use crate::geometry::{self, Point, Segment};

/// Floor tile shade, checkerboard by default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    Light,
    Dark,
}

/// Static maze geometry: boundary + interior walls + floor tile grid
#[derive(Debug, Clone)]
pub struct Maze {
    walls: Vec<Segment>,
    floor: Vec<Vec<TileKind>>,
    cell_size: f32,
    width: f32,
    height: f32,
}

impl Maze {
    /// Build and validate the maze from its configuration.
    ///
    /// Fails when the boundary polygon self-intersects, a wall segment is
    /// degenerate, or the floor grid does not match the declared cell
    /// dimensions.
    pub fn from_config(config: &MazeConfig) -> Result<Self> {
        if config.cells_x == 0 || config.cells_y == 0 {
            return Err(Error::Config(format!(
                "maze must be at least 1x1 cells, got {}x{}",
                config.cells_x, config.cells_y
            )));
        }
        if config.cell_size <= 0.0 {
            return Err(Error::Config(format!(
                "cell_size must be positive, got {}",
                config.cell_size
            )));
        }

        let width = config.cells_x as f32 * config.cell_size;
        let height = config.cells_y as f32 * config.cell_size;

        let boundary = match &config.boundary {
            Some(vertices) => {
                let polygon: Vec<Point> =
                    vertices.iter().map(|v| Point::new(v[0], v[1])).collect();
                validate_boundary(&polygon)?;
                polygon
            }
            None => vec![
                Point::new(0.0, 0.0),
                Point::new(width, 0.0),
                Point::new(width, height),
                Point::new(0.0, height),
            ],
        };

        let mut walls = geometry::polygon_edges(&boundary);
        for (i, w) in config.walls.iter().enumerate() {
            let segment = Segment::new(Point::new(w[0], w[1]), Point::new(w[2], w[3]));
            if segment.a.distance(segment.b) < geometry::EPSILON {
                return Err(Error::Config(format!(
                    "wall {} is degenerate: ({}, {}) -> ({}, {})",
                    i, w[0], w[1], w[2], w[3]
                )));
            }
            walls.push(segment);
        }

        let floor = build_floor(config)?;

        Ok(Self {
            walls,
            floor,
            cell_size: config.cell_size,
            width,
            height,
        })
    }

    /// All wall segments, boundary edges first
    pub fn walls(&self) -> &[Segment] {
        &self.walls
    }

    /// Floor tile under a world point, `None` outside the grid
    pub fn floor_at(&self, x: f32, y: f32) -> Option<TileKind> {
        if x < 0.0 || y < 0.0 || x >= self.width || y >= self.height {
            return None;
        }
        let col = (x / self.cell_size) as usize;
        let row = (y / self.cell_size) as usize;
        self.floor.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }
}

/// Boundary polygons must be simple: no repeated vertices, no edge crossings
fn validate_boundary(polygon: &[Point]) -> Result<()> {
    if polygon.len() < 3 {
        return Err(Error::Config(format!(
            "boundary needs at least 3 vertices, got {}",
            polygon.len()
        )));
    }

    let edges = geometry::polygon_edges(polygon);
    for (i, e) in edges.iter().enumerate() {
        if e.a.distance(e.b) < geometry::EPSILON {
            return Err(Error::Config(format!(
                "boundary edge {} is degenerate at ({}, {})",
                i, e.a.x, e.a.y
            )));
        }
    }

    // Non-adjacent edge pairs must not cross
    let n = edges.len();
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue; // first and last edges share a vertex
            }
            if geometry::segment_intersection(&edges[i], &edges[j]).is_some() {
                return Err(Error::Config(format!(
                    "boundary self-intersects between edges {} and {}",
                    i, j
                )));
            }
        }
    }
    Ok(())
}

fn build_floor(config: &MazeConfig) -> Result<Vec<Vec<TileKind>>> {
    match &config.floor_rows {
        Some(rows) => {
            if rows.len() != config.cells_y {
                return Err(Error::Config(format!(
                    "floor grid has {} rows, maze is {} cells tall",
                    rows.len(),
                    config.cells_y
                )));
            }
            let mut floor = Vec::with_capacity(rows.len());
            for (y, row) in rows.iter().enumerate() {
                if row.len() != config.cells_x {
                    return Err(Error::Config(format!(
                        "floor row {} has {} tiles, maze is {} cells wide",
                        y,
                        row.len(),
                        config.cells_x
                    )));
                }
                let mut tiles = Vec::with_capacity(row.len());
                for (x, ch) in row.chars().enumerate() {
                    tiles.push(match ch {
                        '0' => TileKind::Light,
                        '1' => TileKind::Dark,
                        other => {
                            return Err(Error::Config(format!(
                                "floor row {} column {}: unknown tile '{}'",
                                y, x, other
                            )));
                        }
                    });
                }
                floor.push(tiles);
            }
            Ok(floor)
        }
        None => {
            // Default checkerboard
            let floor = (0..config.cells_y)
                .map(|y| {
                    (0..config.cells_x)
                        .map(|x| {
                            if (x + y) % 2 == 0 {
                                TileKind::Light
                            } else {
                                TileKind::Dark
                            }
                        })
                        .collect()
                })
                .collect();
            Ok(floor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MazeConfig;

    fn basic_config() -> MazeConfig {
        MazeConfig {
            cells_x: 4,
            cells_y: 2,
            cell_size: 10.0,
            walls: Vec::new(),
            boundary: None,
            floor_rows: None,
        }
    }

    #[test]
    fn test_boundary_walls_generated() {
        let maze = Maze::from_config(&basic_config()).unwrap();
        // Rectangle boundary contributes exactly four walls
        assert_eq!(maze.walls().len(), 4);
        assert_eq!(maze.width(), 40.0);
        assert_eq!(maze.height(), 20.0);
    }

    #[test]
    fn test_interior_walls_appended() {
        let mut config = basic_config();
        config.walls.push([10.0, 0.0, 10.0, 10.0]);
        let maze = Maze::from_config(&config).unwrap();
        assert_eq!(maze.walls().len(), 5);
    }

    #[test]
    fn test_degenerate_wall_rejected() {
        let mut config = basic_config();
        config.walls.push([5.0, 5.0, 5.0, 5.0]);
        assert!(Maze::from_config(&config).is_err());
    }

    #[test]
    fn test_self_intersecting_boundary_rejected() {
        let mut config = basic_config();
        // Bowtie
        config.boundary = Some(vec![
            [0.0, 0.0],
            [10.0, 10.0],
            [10.0, 0.0],
            [0.0, 10.0],
        ]);
        assert!(Maze::from_config(&config).is_err());
    }

    #[test]
    fn test_checkerboard_floor() {
        let maze = Maze::from_config(&basic_config()).unwrap();
        assert_eq!(maze.floor_at(5.0, 5.0), Some(TileKind::Light));
        assert_eq!(maze.floor_at(15.0, 5.0), Some(TileKind::Dark));
        assert_eq!(maze.floor_at(15.0, 15.0), Some(TileKind::Light));
        assert_eq!(maze.floor_at(-1.0, 5.0), None);
        assert_eq!(maze.floor_at(41.0, 5.0), None);
    }

    #[test]
    fn test_explicit_floor_rows() {
        let mut config = basic_config();
        config.floor_rows = Some(vec!["0011".to_string(), "1100".to_string()]);
        let maze = Maze::from_config(&config).unwrap();
        assert_eq!(maze.floor_at(5.0, 5.0), Some(TileKind::Light));
        assert_eq!(maze.floor_at(35.0, 5.0), Some(TileKind::Dark));
        assert_eq!(maze.floor_at(5.0, 15.0), Some(TileKind::Dark));
    }

    #[test]
    fn test_ragged_floor_rows_rejected() {
        let mut config = basic_config();
        config.floor_rows = Some(vec!["0011".to_string(), "110".to_string()]);
        assert!(Maze::from_config(&config).is_err());

        config.floor_rows = Some(vec!["0011".to_string()]);
        assert!(Maze::from_config(&config).is_err());
    }
}
