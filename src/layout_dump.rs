use crate::ir::PdCode;
use crate::layout::DiagramLayout;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub pd_code: String,
    pub seed: u64,
    pub attempts: usize,
    pub rows: usize,
    pub cols: usize,
    pub grid: Vec<Vec<i32>>,
    pub segments: Vec<SegmentDump>,
    pub crossings: Vec<CrossingDump>,
}

#[derive(Debug, Serialize)]
pub struct SegmentDump {
    pub socket: i32,
    pub from: [i32; 2],
    pub to: [i32; 2],
}

#[derive(Debug, Serialize)]
pub struct CrossingDump {
    pub x: i32,
    pub y: i32,
    pub horizontal: bool,
}

impl LayoutDump {
    pub fn from_layout(layout: &DiagramLayout, pd: &PdCode) -> Self {
        use crate::layout::GridView;
        use crate::layout::sockets::HORIZONTAL_CROSSING;

        let segments = layout
            .segments()
            .iter()
            .map(|line| SegmentDump {
                socket: line.tag,
                from: [line.from.0, line.from.1],
                to: [line.to.0, line.to.1],
            })
            .collect();
        let crossings = layout
            .crossings
            .negative_cells()
            .into_iter()
            .map(|(x, y)| CrossingDump {
                x,
                y,
                horizontal: layout.crossings.get((x, y)) == HORIZONTAL_CROSSING,
            })
            .collect();

        LayoutDump {
            pd_code: pd.to_string(),
            seed: layout.seed,
            attempts: layout.attempts,
            rows: layout.grid.rows(),
            cols: layout.grid.cols(),
            grid: layout.grid.as_rows().to_vec(),
            segments,
            crossings,
        }
    }
}

pub fn layout_dump_json(layout: &DiagramLayout, pd: &PdCode) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&LayoutDump::from_layout(layout, pd))?)
}
