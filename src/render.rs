use crate::ir::SocketId;
use crate::layout::DiagramGrid;
use crate::layout::ComponentSurvey;
use anyhow::Result;
use std::collections::BTreeSet;
use std::path::Path;

/// One matrix row per line, each cell right-aligned in three columns and
/// followed by a space. Empty cells print blank unless `with_zero`.
pub fn render_grid(grid: &DiagramGrid, with_zero: bool) -> String {
    let mut out = String::new();
    for row in grid.as_rows() {
        for value in row {
            if *value == 0 && !with_zero {
                out.push_str("    ");
            } else {
                out.push_str(&format!("{value:>3} "));
            }
        }
        out.push('\n');
    }
    out
}

/// Components as a JSON array of sorted id arrays.
pub fn render_components(components: &[BTreeSet<SocketId>]) -> String {
    let mut out = String::from("[\n");
    for (idx, component) in components.iter().enumerate() {
        let ids: Vec<String> = component.iter().map(|id| id.to_string()).collect();
        out.push_str(&format!("    [{}]", ids.join(", ")));
        out.push_str(if idx + 1 < components.len() { ",\n" } else { "\n" });
    }
    out.push_str("]\n");
    out
}

pub fn render_survey(surveys: &[ComponentSurvey]) -> String {
    let mut out = String::new();
    for survey in surveys {
        let ids: Vec<String> = survey.component.iter().map(|id| id.to_string()).collect();
        let outcome = match survey.seed {
            Some(seed) => format!("ok (seed {seed})"),
            None => "failed".to_string(),
        };
        out.push_str(&format!("[{}] outer: {outcome}\n", ids.join(", ")));
    }
    out
}

pub fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
        }
        None => {
            print!("{}", text);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_cells_are_right_aligned() {
        let grid = DiagramGrid::new(vec![vec![0, 12], vec![-2, 0]]).unwrap();
        assert_eq!(render_grid(&grid, false), "     12 \n -2     \n");
        assert_eq!(render_grid(&grid, true), "  0  12 \n -2   0 \n");
    }

    #[test]
    fn components_render_as_json() {
        let components = vec![BTreeSet::from([1, 3]), BTreeSet::from([2, 4])];
        let text = render_components(&components);
        assert_eq!(text, "[\n    [1, 3],\n    [2, 4]\n]\n");
        let parsed: Vec<Vec<i32>> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, vec![vec![1, 3], vec![2, 4]]);
    }

    #[test]
    fn survey_lines_report_outcome() {
        let surveys = vec![
            ComponentSurvey {
                component: BTreeSet::from([1, 3]),
                seed: Some(44),
            },
            ComponentSurvey {
                component: BTreeSet::from([2, 4]),
                seed: None,
            },
        ];
        assert_eq!(
            render_survey(&surveys),
            "[1, 3] outer: ok (seed 44)\n[2, 4] outer: failed\n"
        );
    }
}
