//! Carrying completion progress across a project edit.
//!
//! When a project is modified the caller submits a full replacement exposure
//! list. Exposures that are unchanged keep the images already collected for
//! them; exposures that are new or altered in any field start from scratch.

use rust_decimal::Decimal;

use orion_types::{ExposureRequest, Project};

/// Compute `project_data` and `remaining` for a replacement exposure list.
///
/// Defaults are a fresh start: empty data and `remaining = count` for every
/// new exposure. For each new exposure, the existing exposures are scanned
/// from index 0 and the first deep-equal match donates its progress; the scan
/// restarts at 0 for every new index, so one old exposure can serve several
/// equal new ones independently.
///
/// Matching is exact structural equality over all fields including `count`:
/// editing only the image count of an exposure deliberately discards its
/// progress.
pub fn reconcile_progress(
    existing: &Project,
    new_exposures: &[ExposureRequest],
) -> (Vec<Vec<String>>, Vec<Decimal>) {
    let mut project_data: Vec<Vec<String>> = vec![Vec::new(); new_exposures.len()];
    let mut remaining: Vec<Decimal> = new_exposures.iter().map(|e| e.count).collect();

    for (new_index, new_exposure) in new_exposures.iter().enumerate() {
        for (old_index, old_exposure) in existing.exposures.iter().enumerate() {
            if new_exposure == old_exposure {
                project_data[new_index] = existing.project_data[old_index].clone();
                remaining[new_index] = existing.remaining[old_index];
                break;
            }
        }
    }

    (project_data, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exposure(filter: &str, seconds: i64, count: i64) -> ExposureRequest {
        ExposureRequest {
            filter: filter.into(),
            exposure_time: Decimal::from(seconds),
            count: Decimal::from(count),
            bin: Decimal::ONE,
        }
    }

    fn existing_with(
        exposures: Vec<ExposureRequest>,
        project_data: Vec<Vec<String>>,
        remaining: Vec<i64>,
    ) -> Project {
        Project {
            project_name: "m101".into(),
            created_at: "2020-06-24T16:53:56Z".into(),
            user_id: "u1".into(),
            exposures,
            project_data,
            remaining: remaining.into_iter().map(Decimal::from).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn identical_exposures_keep_progress() {
        let existing = existing_with(
            vec![exposure("R", 30, 10), exposure("B", 60, 4)],
            vec![vec!["a.fits".into()], vec!["b.fits".into(), "c.fits".into()]],
            vec![9, 2],
        );

        let (data, remaining) = reconcile_progress(&existing, &existing.exposures.clone());
        assert_eq!(data, existing.project_data);
        assert_eq!(remaining, existing.remaining);
    }

    #[test]
    fn count_change_resets_progress() {
        let existing = existing_with(
            vec![exposure("R", 30, 10)],
            vec![vec!["a.fits".into()]],
            vec![9],
        );

        // Only the count differs: treated as an entirely different exposure.
        let (data, remaining) = reconcile_progress(&existing, &[exposure("R", 30, 5)]);
        assert_eq!(data, vec![Vec::<String>::new()]);
        assert_eq!(remaining, vec![Decimal::from(5)]);
    }

    #[test]
    fn altered_exposure_resets_while_neighbors_survive() {
        let existing = existing_with(
            vec![exposure("R", 30, 10), exposure("B", 60, 4)],
            vec![vec!["a.fits".into()], vec!["b.fits".into()]],
            vec![9, 3],
        );

        let (data, remaining) =
            reconcile_progress(&existing, &[exposure("R", 30, 10), exposure("B", 120, 4)]);
        assert_eq!(data[0], vec!["a.fits".to_string()]);
        assert_eq!(remaining[0], Decimal::from(9));
        assert!(data[1].is_empty());
        assert_eq!(remaining[1], Decimal::from(4));
    }

    #[test]
    fn first_match_wins_and_fans_out() {
        let existing = existing_with(
            vec![exposure("R", 30, 10), exposure("R", 30, 10)],
            vec![vec!["first.fits".into()], vec!["second.fits".into()]],
            vec![9, 8],
        );

        // Two equal new exposures both match old index 0 independently.
        let (data, remaining) =
            reconcile_progress(&existing, &[exposure("R", 30, 10), exposure("R", 30, 10)]);
        assert_eq!(data[0], vec!["first.fits".to_string()]);
        assert_eq!(data[1], vec!["first.fits".to_string()]);
        assert_eq!(remaining, vec![Decimal::from(9), Decimal::from(9)]);
    }

    #[test]
    fn reorder_follows_matches() {
        let existing = existing_with(
            vec![exposure("R", 30, 10), exposure("B", 60, 4)],
            vec![vec!["r.fits".into()], vec!["b.fits".into()]],
            vec![9, 3],
        );

        let (data, remaining) =
            reconcile_progress(&existing, &[exposure("B", 60, 4), exposure("R", 30, 10)]);
        assert_eq!(data, vec![vec!["b.fits".to_string()], vec!["r.fits".to_string()]]);
        assert_eq!(remaining, vec![Decimal::from(3), Decimal::from(9)]);
    }

    #[test]
    fn output_lengths_track_new_exposures() {
        let existing = existing_with(
            vec![exposure("R", 30, 10)],
            vec![vec!["a.fits".into()]],
            vec![9],
        );

        let new = vec![
            exposure("R", 30, 10),
            exposure("B", 60, 4),
            exposure("V", 15, 20),
        ];
        let (data, remaining) = reconcile_progress(&existing, &new);
        assert_eq!(data.len(), new.len());
        assert_eq!(remaining.len(), new.len());
    }

    #[test]
    fn empty_new_list_clears_everything() {
        let existing = existing_with(
            vec![exposure("R", 30, 10)],
            vec![vec!["a.fits".into()]],
            vec![9],
        );

        let (data, remaining) = reconcile_progress(&existing, &[]);
        assert!(data.is_empty());
        assert!(remaining.is_empty());
    }
}
