mod complexity;
mod decomposition;
mod patterns;

use tracing::{debug, info};

use complexity::*;
use decomposition::*;

use crate::planning::task_types::*;

/// Turns a description into an ordered step list; `None` means no plan exists.
pub trait DecompositionPlanner: Send + Sync {
    fn plan(&self, description: &str) -> Option<DecompositionPlan>;
}

/// Lexical complexity scorer and rule-based planner.
///
/// Both operations are pure: the keyword table and category rules are
/// process-wide constants, so the analyzer carries no state of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskAnalyzer;

impl TaskAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Scores a description. Total over all inputs; never negative.
    pub fn score(&self, description: &str) -> ComplexityReport {
        debug!("Scoring task: {}", description);

        let report = score_description(description);
        info!(score = report.score, reasons = ?report.reasons, "complexity scored");
        report
    }

    /// Breaks a description into ordered steps using the first matching category.
    pub fn plan(&self, description: &str) -> Option<DecompositionPlan> {
        debug!("Planning task: {}", description);
        plan_description(description)
    }
}

impl DecompositionPlanner for TaskAnalyzer {
    fn plan(&self, description: &str) -> Option<DecompositionPlan> {
        TaskAnalyzer::plan(self, description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_negative_scores_clamp_to_zero() {
        let analyzer = TaskAnalyzer::new();

        // five simple operations at -1 each, nothing positive
        let report = analyzer.score("获取查询显示返回输出");
        assert_eq!(report.score, 0);
        assert_eq!(report.reasons.len(), 5);
        assert!(report.reasons.iter().all(|r| r.starts_with("simple operation")));

        let report = analyzer.score("show me, display it");
        assert_eq!(report.score, 0);
        assert_eq!(
            report.reasons,
            vec![
                "simple operation: show".to_string(),
                "simple operation: display".to_string(),
            ]
        );
    }

    #[test]
    fn test_plan_never_empty() {
        let analyzer = TaskAnalyzer::new();
        let inputs = ["", " ", "ip", "文本", "数据", "时间", "计算", "\n\t"];
        for input in inputs {
            assert!(analyzer.plan(input).is_some_and(|p| p.len() >= 1), "{input:?}");
        }
    }

    #[test]
    fn test_compound_description_scores_above_default_threshold() {
        let analyzer = TaskAnalyzer::new();
        let report = analyzer.score("分析数据，统计结果，生成报告。");
        assert!(report.score >= 5);

        let plan = analyzer.plan("分析数据，统计结果，生成报告。").unwrap();
        assert!(plan.len() >= 4);
    }
}
