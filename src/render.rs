use crate::types::SlabInstance;

const MAX_WIDTH: f64 = 80.0;
const MAX_HEIGHT: f64 = 40.0;

/// Draws a slab and its pieces as ASCII art, labelling each piece with its
/// product name (or its size when the name does not fit).
pub fn render_slab(slab: &SlabInstance) -> String {
    if slab.width <= 0.0 || slab.height <= 0.0 {
        return String::new();
    }
    // Terminal cells are about twice as tall as they are wide.
    let scale = f64::min(MAX_WIDTH / slab.width, 2.0 * MAX_HEIGHT / slab.height);
    let to_cols = |v: f64| (v * scale).round() as usize;
    let to_rows = |v: f64| (v * scale / 2.0).round() as usize;

    let grid_w = to_cols(slab.width);
    let grid_h = to_rows(slab.height);
    if grid_w == 0 || grid_h == 0 {
        return String::new();
    }

    let mut grid = vec![vec![' '; grid_w + 1]; grid_h + 1];
    draw_rect(&mut grid, 0, 0, grid_w, grid_h);

    for p in &slab.pieces {
        let fp = p.footprint();
        let sx = to_cols(p.placement.x);
        let sy = to_rows(p.placement.y);
        let sw = to_cols(fp.w);
        let sh = to_rows(fp.h);
        if sw == 0 || sh == 0 {
            continue;
        }
        draw_rect(&mut grid, sx, sy, sw, sh);

        if sw < 3 || sh < 2 {
            continue;
        }
        let inner = sw - 1;
        let label = [p.piece.name.clone(), fp.to_string()]
            .into_iter()
            .find(|l| l.chars().count() <= inner)
            .unwrap_or_else(|| fp.to_string().chars().take(inner).collect());

        let chars: Vec<char> = label.chars().collect();
        let cy = sy + sh / 2;
        let start_x = (sx + sw / 2).saturating_sub(chars.len() / 2).max(sx + 1);
        for (i, &ch) in chars.iter().enumerate() {
            let x = start_x + i;
            if x < sx + sw && cy < grid.len() && x < grid[cy].len() {
                grid[cy][x] = ch;
            }
        }
    }

    let mut out = String::new();
    for row in &grid {
        let line: String = row.iter().collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn put_edge(grid: &mut [Vec<char>], x: usize, y: usize, edge: char) {
    let Some(cell) = grid.get_mut(y).and_then(|row| row.get_mut(x)) else {
        return;
    };
    *cell = match (*cell, edge) {
        (' ', e) => e,
        (c, e) if c == e => e,
        _ => '+',
    };
}

fn draw_rect(grid: &mut [Vec<char>], x: usize, y: usize, w: usize, h: usize) {
    for i in x..=x + w {
        put_edge(grid, i, y, '-');
        put_edge(grid, i, y + h, '-');
    }
    for j in y..=y + h {
        put_edge(grid, x, j, '|');
        put_edge(grid, x + w, j, '|');
    }
    for (cx, cy) in [(x, y), (x + w, y), (x, y + h), (x + w, y + h)] {
        if let Some(cell) = grid.get_mut(cy).and_then(|row| row.get_mut(cx)) {
            *cell = '+';
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Piece, PlacedPiece, Placement, Priority};

    fn placed(name: &str, x: f64, y: f64, width: f64, depth: f64, rotated: bool) -> PlacedPiece {
        PlacedPiece {
            piece: Piece {
                product_index: 0,
                piece_index: 0,
                width,
                depth,
                name: name.into(),
                edge_detail: "Eased".into(),
                priority: Priority::Normal,
            },
            placement: Placement {
                x,
                y,
                rotated,
                slab_index: 0,
            },
        }
    }

    fn slab(pieces: Vec<PlacedPiece>) -> SlabInstance {
        SlabInstance {
            width: 126.0,
            height: 63.0,
            pieces,
            efficiency: 0.0,
        }
    }

    #[test]
    fn test_render_labels_piece_by_name() {
        let output = render_slab(&slab(vec![placed("Kitchen", 0.0, 0.0, 96.0, 24.0, false)]));
        assert!(output.contains('+'));
        assert!(output.contains('-'));
        assert!(output.contains('|'));
        assert!(output.contains("Kitchen"));
    }

    #[test]
    fn test_render_falls_back_to_size_label() {
        let output = render_slab(&slab(vec![placed(
            "A very long vanity top name that will not fit",
            0.0,
            0.0,
            30.0,
            24.0,
            true,
        )]));
        assert!(output.contains("24x30"));
    }

    #[test]
    fn test_render_empty_slab_draws_border() {
        let output = render_slab(&slab(vec![]));
        assert!(output.starts_with('+'));
        assert_eq!(output.lines().count(), 21);
    }
}
