use std::collections::{BTreeSet, HashMap};
use std::io::Write;

use serde::Serialize;

use crate::layout::sockets::VERTICAL_CROSSING;
use crate::layout::{DiagramLayout, GridView, Line};

pub type Point3 = (i32, i32, i32);

/// Points and links of a diagram lifted into 3D: strands lie at z = 0 and
/// every over-strand bridges its crossing at z = 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Skeleton {
    points: Vec<Point3>,
    #[serde(skip)]
    index: HashMap<Point3, usize>,
    links: BTreeSet<(usize, usize)>,
}

impl Skeleton {
    pub fn from_layout(layout: &DiagramLayout) -> Self {
        let view = layout.view();
        let mut skeleton = Skeleton::default();
        for line in layout.segments() {
            skeleton.link_segment(&view, line);
        }
        for (x, y) in view.negative_cells() {
            let (dx, dy) = if view.get((x, y)) == VERTICAL_CROSSING {
                (1, 0)
            } else {
                (0, 1)
            };
            let before = (x - dx, y - dy, 1);
            let above = (x, y, 1);
            let after = (x + dx, y + dy, 1);
            skeleton.link(before, (before.0, before.1, 0));
            skeleton.link(after, (after.0, after.1, 0));
            skeleton.link(before, above);
            skeleton.link(above, after);
        }
        skeleton
    }

    /// Points in numbering order; point `i` has id `i + 1`.
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Links as pairs of 1-based point ids, smaller id first.
    pub fn links(&self) -> &BTreeSet<(usize, usize)> {
        &self.links
    }

    pub fn write_text(&self, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(out, "node_cnt {}", self.points.len())?;
        writeln!(out, "edge_cnt {}", self.links.len())?;
        for (idx, (x, y, z)) in self.points.iter().enumerate() {
            writeln!(out, "node {} pos {x} {y} {z}", idx + 1)?;
        }
        for (a, b) in &self.links {
            writeln!(out, "link {a} {b}")?;
        }
        Ok(())
    }

    /// Unit steps along `line` whose both cells still carry the line's tag.
    fn link_segment<G: GridView>(&mut self, view: &G, line: &Line) {
        if line.tag <= 0 || !line.is_axis_aligned() {
            return;
        }
        let cells: Vec<_> = line.cells().collect();
        for pair in cells.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if view.get(a) == line.tag && view.get(b) == line.tag {
                self.link((a.0, a.1, 0), (b.0, b.1, 0));
            }
        }
    }

    fn point_id(&mut self, point: Point3) -> usize {
        if let Some(id) = self.index.get(&point) {
            return *id;
        }
        self.points.push(point);
        let id = self.points.len();
        self.index.insert(point, id);
        id
    }

    fn link(&mut self, a: Point3, b: Point3) {
        let a = self.point_id(a);
        let b = self.point_id(b);
        if a != b {
            self.links.insert((a.min(b), a.max(b)));
        }
    }
}
