//! Builds the full-recomputation request from the live decomposition.

use crate::config::RequestOptions;
use crate::fd::select_top_level;
use crate::group::SchemaGroup;
use crate::projection::{Tuple, project};
use crate::relation::OriginalRelation;
use crate::sync::wire::{DecomposeAllRequest, TableRequest};

/// Encode projected tuples in the backend's manual-data text form: cells
/// joined by `,`, rows by `;`. Cell values containing either delimiter are
/// not escaped; the backend cannot read them back unambiguously.
pub fn encode_manual_data(tuples: &[Tuple]) -> String {
    tuples
        .iter()
        .map(|t| t.join(","))
        .collect::<Vec<_>>()
        .join(";")
}

pub fn table_request(
    relation: &OriginalRelation,
    group: &SchemaGroup,
    options: &RequestOptions,
) -> TableRequest {
    TableRequest {
        columns: group.columns().to_vec(),
        manual_data: encode_manual_data(&project(relation, group.columns())),
        fds: group.projected_fds().join(";"),
        time_limit: options.time_limit,
        monte_carlo: options.monte_carlo,
        samples: options.samples,
    }
}

pub fn build_request(
    relation: &OriginalRelation,
    groups: &[SchemaGroup],
    options: &RequestOptions,
) -> DecomposeAllRequest {
    let tables = groups
        .iter()
        .map(|g| table_request(relation, g, options))
        .collect();

    let per_table: Vec<&[String]> = groups.iter().map(SchemaGroup::projected_fds).collect();
    let fds = select_top_level(
        options.fd_list_with_closure.as_deref(),
        options.fd_list.as_deref(),
        &per_table,
    );

    DecomposeAllRequest {
        tables,
        fds: fds.join(";"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Decomposition;
    use crate::ric::RicMatrix;

    fn relation() -> OriginalRelation {
        OriginalRelation::from_manual_data("a,1,x;a,2,x;b,1,y", RicMatrix::default())
    }

    #[test]
    fn test_manual_data_is_deduplicated_projection() {
        let rel = relation();
        let mut d = Decomposition::new(rel.column_count());
        let id = d.create_group();
        d.resequence(id, &[0, 2]).unwrap();
        d.group_mut(id)
            .unwrap()
            .set_projected_fds(vec!["A->C".into(), "C->A".into()]);

        let req = build_request(&rel, d.groups(), &RequestOptions::default());
        assert_eq!(req.tables.len(), 1);
        assert_eq!(req.tables[0].columns, vec![0, 2]);
        assert_eq!(req.tables[0].manual_data, "a,x;b,y");
        assert_eq!(req.tables[0].fds, "A->C;C->A");
        assert_eq!(req.tables[0].time_limit, 30);
        assert_eq!(req.fds, "A->C;C->A");
    }

    #[test]
    fn test_empty_group_sends_empty_manual_data() {
        let rel = relation();
        let mut d = Decomposition::new(rel.column_count());
        d.create_group();
        let req = build_request(&rel, d.groups(), &RequestOptions::default());
        assert!(req.tables[0].columns.is_empty());
        assert_eq!(req.tables[0].manual_data, "");
    }

    #[test]
    fn test_explicit_fd_lists_take_priority() {
        let rel = relation();
        let mut d = Decomposition::new(rel.column_count());
        let id = d.create_group();
        d.group_mut(id).unwrap().set_projected_fds(vec!["A->B".into()]);

        let options = RequestOptions {
            fd_list: Some("A->B;B->C".into()),
            ..RequestOptions::default()
        };
        assert_eq!(build_request(&rel, d.groups(), &options).fds, "A->B;B->C");

        let options = RequestOptions {
            fd_list_with_closure: Some("[\"A->C\"]".into()),
            fd_list: Some("A->B".into()),
            ..RequestOptions::default()
        };
        assert_eq!(build_request(&rel, d.groups(), &options).fds, "A->C");
    }

    #[test]
    fn test_merged_fds_across_tables() {
        let rel = relation();
        let mut d = Decomposition::new(rel.column_count());
        let a = d.create_group();
        let b = d.create_group();
        d.group_mut(a).unwrap().set_projected_fds(vec!["A->B".into()]);
        d.group_mut(b)
            .unwrap()
            .set_projected_fds(vec!["A->B".into(), "B->C".into()]);
        let req = build_request(&rel, d.groups(), &RequestOptions::default());
        assert_eq!(req.fds, "A->B;B->C");
    }
}
