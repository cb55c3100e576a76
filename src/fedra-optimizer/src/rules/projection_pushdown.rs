//! Projection pushdown optimization rule.

use std::collections::BTreeSet;

use common_error::FedraResult;
use fedra_logical::{FilterOp, LogicalExpr, LogicalOp, LogicalPlan, ProjectOp};

use super::rule::{OptimizationRule, Transformed, rewrite_plan};

/// Projection pushdown optimization.
///
/// Starting from a projection, computes the columns its expressions read,
/// narrows intervening filters and projections to what they and everything
/// above them need, and places a column-only projection directly over the
/// scan. The converter turns that projection into the remote column list.
///
/// Columns read by filter predicates are kept even when the outer
/// projection drops them.
pub struct ProjectionPushdown;

impl OptimizationRule for ProjectionPushdown {
    fn name(&self) -> &'static str {
        "ProjectionPushdown"
    }

    fn description(&self) -> &'static str {
        "Narrow scans to the columns the plan actually reads"
    }

    fn apply(&self, plan: LogicalPlan) -> FedraResult<Transformed> {
        rewrite_plan(plan, |op| Ok(push_projection(op)))
    }
}

/// Old column position to new column position; `None` for dropped columns.
type Mapping = Vec<Option<usize>>;

fn push_projection(op: LogicalOp) -> (LogicalOp, bool) {
    let LogicalOp::Project { input, project } = op else {
        return (op, false);
    };

    match *input {
        // already in its final shape
        scan @ LogicalOp::Scan(_) if project.pure_refs().is_some() => {
            (LogicalOp::project(scan, project), false)
        }

        // two column-only projections collapse into one
        LogicalOp::Project {
            input: inner,
            project: inner_project,
        } if project.pure_refs().is_some() && inner_project.pure_refs().is_some() => {
            match substitute_all(&project.exprs, &inner_project.exprs) {
                Some(exprs) => (
                    LogicalOp::project(*inner, ProjectOp::new(exprs, project.names)),
                    true,
                ),
                None => (
                    LogicalOp::project(LogicalOp::project(*inner, inner_project), project),
                    false,
                ),
            }
        }

        input => {
            let required = refs_of(&project.exprs);
            let (input, mapping, changed) = narrow(input, &required);
            let project = if changed {
                ProjectOp::new(remap_all(&project.exprs, &mapping), project.names)
            } else {
                project
            };
            (LogicalOp::project(input, project), changed)
        }
    }
}

/// Narrow `op` to the `required` output columns.
///
/// Returns the rewritten operator, where each old output column now lives,
/// and whether anything changed. Every required column is always mapped.
fn narrow(op: LogicalOp, required: &BTreeSet<usize>) -> (LogicalOp, Mapping, bool) {
    let width = op.output_width();
    match op {
        LogicalOp::Scan(scan) => {
            if width == 0 || required.len() >= width {
                return (LogicalOp::Scan(scan), identity(width), false);
            }
            let keep = kept_positions(required);
            let project = ProjectOp::refs(&keep, &scan.columns);
            (
                LogicalOp::project(LogicalOp::Scan(scan), project),
                mapping_for(&keep, width),
                true,
            )
        }

        LogicalOp::Project { input, project } => {
            let keep = kept_positions(required);
            let keep: Vec<usize> = keep.into_iter().filter(|&i| i < width).collect();
            let dropped = keep.len() < width;
            let kept_exprs: Vec<LogicalExpr> =
                keep.iter().map(|&i| project.exprs[i].clone()).collect();
            let kept_names: Vec<String> = keep.iter().map(|&i| project.names[i].clone()).collect();

            if matches!(*input, LogicalOp::Scan(_)) && project.pure_refs().is_some() {
                // column-only projection over a scan is narrowed in place
                let project = ProjectOp::new(kept_exprs, kept_names);
                return (
                    LogicalOp::project(*input, project),
                    mapping_for(&keep, width),
                    dropped,
                );
            }

            let inner_required = refs_of(&kept_exprs);
            let (input, inner_mapping, inner_changed) = narrow(*input, &inner_required);
            let exprs = if inner_changed {
                remap_all(&kept_exprs, &inner_mapping)
            } else {
                kept_exprs
            };
            (
                LogicalOp::project(input, ProjectOp::new(exprs, kept_names)),
                mapping_for(&keep, width),
                dropped || inner_changed,
            )
        }

        LogicalOp::Filter { input, filter } => {
            let mut inner_required = required.clone();
            inner_required.extend(filter.condition.input_refs());
            let (input, mapping, changed) = narrow(*input, &inner_required);
            let condition = if changed {
                remap(&filter.condition, &mapping)
            } else {
                filter.condition
            };
            (
                LogicalOp::filter(input, FilterOp::new(condition)),
                mapping,
                changed,
            )
        }

        other @ (LogicalOp::Join { .. } | LogicalOp::Aggregate { .. } | LogicalOp::Sort { .. }) => {
            (other, identity(width), false)
        }
    }
}

fn refs_of(exprs: &[LogicalExpr]) -> BTreeSet<usize> {
    exprs.iter().flat_map(LogicalExpr::input_refs).collect()
}

/// Positions to keep, in ascending order. A relation never narrows to zero columns.
fn kept_positions(required: &BTreeSet<usize>) -> Vec<usize> {
    if required.is_empty() {
        vec![0]
    } else {
        required.iter().copied().collect()
    }
}

fn identity(width: usize) -> Mapping {
    (0..width).map(Some).collect()
}

fn mapping_for(keep: &[usize], width: usize) -> Mapping {
    let mut mapping = vec![None; width];
    for (new, &old) in keep.iter().enumerate() {
        if old < width {
            mapping[old] = Some(new);
        }
    }
    mapping
}

fn remap(expr: &LogicalExpr, mapping: &Mapping) -> LogicalExpr {
    // required columns are always mapped; the fallback keeps unmapped refs untouched
    expr.remap(&|i| mapping.get(i).copied().flatten().unwrap_or(i))
}

fn remap_all(exprs: &[LogicalExpr], mapping: &Mapping) -> Vec<LogicalExpr> {
    exprs.iter().map(|e| remap(e, mapping)).collect()
}

fn substitute_all(outer: &[LogicalExpr], inner: &[LogicalExpr]) -> Option<Vec<LogicalExpr>> {
    outer.iter().map(|e| e.substitute(inner)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedra_logical::{PlanBuilder, SortKey, col, lit};

    fn apply(plan: LogicalPlan) -> Transformed {
        ProjectionPushdown.apply(plan).unwrap()
    }

    #[test]
    fn test_projection_placed_over_scan() {
        let plan = PlanBuilder::table("t", ["a", "b", "c", "d"])
            .project(vec![col(3).add(col(1))], vec!["s".into()])
            .build();

        let result = apply(plan);

        assert!(result.changed);
        let LogicalOp::Project { input, project } = result.plan.root() else {
            panic!("expected projection root");
        };
        assert_eq!(project.exprs, vec![col(1).add(col(0))]);
        let LogicalOp::Project { input: scan, project: narrow } = input.as_ref() else {
            panic!("expected narrowed projection");
        };
        assert_eq!(narrow.exprs, vec![col(1), col(3)]);
        assert_eq!(narrow.names, vec!["b", "d"]);
        assert!(matches!(scan.as_ref(), LogicalOp::Scan(_)));
    }

    #[test]
    fn test_filter_columns_are_kept() {
        // SELECT a FROM t WHERE c > 1
        let plan = PlanBuilder::table("t", ["a", "b", "c"])
            .filter(col(2).gt(lit(1i64)))
            .project(vec![col(0)], vec!["a".into()])
            .build();

        let result = apply(plan);

        let LogicalOp::Project { input, project } = result.plan.root() else {
            panic!("expected projection root");
        };
        assert_eq!(project.exprs, vec![col(0)]);
        let LogicalOp::Filter { input, filter } = input.as_ref() else {
            panic!("expected filter");
        };
        assert_eq!(filter.condition, col(1).gt(lit(1i64)));
        let LogicalOp::Project { project, .. } = input.as_ref() else {
            panic!("expected narrowed projection");
        };
        assert_eq!(project.names, vec!["a", "c"]);
    }

    #[test]
    fn test_full_width_projection_unchanged() {
        let plan = PlanBuilder::table("t", ["a", "b"])
            .project(vec![col(1).add(col(0))], vec!["s".into()])
            .build();

        let result = apply(plan.clone());

        assert!(!result.changed);
        assert_eq!(result.plan, plan);
    }

    #[test]
    fn test_stops_at_sort() {
        let plan = PlanBuilder::table("t", ["a", "b"])
            .sort(vec![SortKey::asc(1)])
            .project_columns(&[0])
            .build();

        let result = apply(plan);

        assert!(!result.changed);
    }

    #[test]
    fn test_column_projections_collapse() {
        let plan = PlanBuilder::table("t", ["a", "b", "c"])
            .project_columns(&[2, 0])
            .project_columns(&[1])
            .build();

        let result = apply(plan);

        let LogicalOp::Project { input, project } = result.plan.root() else {
            panic!("expected projection");
        };
        assert_eq!(project.exprs, vec![col(0)]);
        assert_eq!(project.names, vec!["a"]);
        assert!(matches!(input.as_ref(), LogicalOp::Scan(_)));
    }

    #[test]
    fn test_is_idempotent() {
        let plan = PlanBuilder::table("t", ["a", "b", "c", "d"])
            .filter(col(2).is_not_null())
            .project(vec![col(0), lit(1i64)], vec!["a".into(), "one".into()])
            .build();

        let once = apply(plan).plan;
        let twice = apply(once.clone());

        assert!(!twice.changed);
        assert_eq!(twice.plan, once);
    }
}
