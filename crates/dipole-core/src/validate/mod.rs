//! Range checks over ingested payloads and assembly of the 103-wide batch.
//!
//! A batch is accepted only when every row passes; the reported error lists
//! every row that failed the first violated rule in this order: missing aux
//! params, feature range, `x_Bj` range, `c2`.

mod policy;

pub use policy::{
    OpenClosedRange, PHYSICAL_LOWER_BOUND, PHYSICAL_UPPER_BOUND, PolicyError, ValidationPolicy,
    load_validation_policy,
};

use crate::domain::{
    AUGMENTED_WIDTH, AuxiliaryParams, FEATURE_COUNT, FeatureBatch, FeatureMatrix, RecordLayout,
    ValidationError, ValidationErrorKind, X_BJ_COLUMN,
};
use crate::ingest::IngestedPayload;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureValidator {
    policy: ValidationPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Violation {
    row: usize,
    column: usize,
    value: f64,
}

impl FeatureValidator {
    pub const fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn validate(
        &self,
        payload: &IngestedPayload,
        aux: Option<AuxiliaryParams>,
    ) -> Result<FeatureBatch, ValidationError> {
        let matrix = payload.matrix();
        let batch = match payload.layout() {
            RecordLayout::Bare => {
                let aux = aux.ok_or_else(|| {
                    ValidationError::new(
                        ValidationErrorKind::MissingAuxiliaryParams,
                        all_rows(matrix),
                        "bare records need c2 and x_Bj supplied alongside the payload",
                    )
                })?;
                self.check_features(matrix)?;
                self.check_supplied_auxiliary(matrix, aux)?;
                append_auxiliary(matrix, aux)
            }
            RecordLayout::Augmented => {
                if let Some(aux) = aux {
                    tracing::debug!(
                        c2 = aux.c2,
                        x_bj = aux.x_bj,
                        "augmented payload carries its own auxiliary columns; supplied values ignored"
                    );
                }
                self.check_features(matrix)?;
                self.check_stored_x_bj(matrix)?;
                FeatureBatch::from_validated(matrix.clone())
            }
        };

        tracing::debug!(rows = batch.len(), layout = %payload.layout(), "validated feature batch");
        Ok(batch)
    }

    /// Runs the augmented-record rules over an existing batch.
    pub fn revalidate(&self, batch: &FeatureBatch) -> Result<FeatureBatch, ValidationError> {
        let matrix = batch.as_matrix();
        self.check_features(matrix)?;
        self.check_stored_x_bj(matrix)?;
        Ok(batch.clone())
    }

    fn check_features(&self, matrix: &FeatureMatrix) -> Result<(), ValidationError> {
        let range = self.policy.feature_range;
        let violations: Vec<Violation> = matrix
            .iter_rows()
            .enumerate()
            .filter_map(|(row, record)| {
                record[..FEATURE_COUNT]
                    .iter()
                    .position(|value| !range.contains(*value))
                    .map(|column| Violation {
                        row,
                        column,
                        value: record[column],
                    })
            })
            .collect();

        let Some(first) = violations.first() else {
            return Ok(());
        };
        Err(ValidationError::new(
            ValidationErrorKind::InvalidFeatureRange,
            violations.iter().map(|violation| violation.row).collect(),
            format!(
                "feature values must lie in {}; first violation at row {}, column {}: {:e}",
                range, first.row, first.column, first.value
            ),
        ))
    }

    fn check_stored_x_bj(&self, matrix: &FeatureMatrix) -> Result<(), ValidationError> {
        let range = self.policy.x_bj_range;
        let violations: Vec<Violation> = matrix
            .iter_rows()
            .enumerate()
            .filter(|(_, record)| !range.contains(record[X_BJ_COLUMN]))
            .map(|(row, record)| Violation {
                row,
                column: X_BJ_COLUMN,
                value: record[X_BJ_COLUMN],
            })
            .collect();

        let Some(first) = violations.first() else {
            return Ok(());
        };
        Err(ValidationError::new(
            ValidationErrorKind::InvalidXBjRange,
            violations.iter().map(|violation| violation.row).collect(),
            format!(
                "x_Bj (last column) must lie in {}; row {} has {:e}",
                range, first.row, first.value
            ),
        ))
    }

    fn check_supplied_auxiliary(
        &self,
        matrix: &FeatureMatrix,
        aux: AuxiliaryParams,
    ) -> Result<(), ValidationError> {
        let range = self.policy.x_bj_range;
        if !range.contains(aux.x_bj) {
            return Err(ValidationError::new(
                ValidationErrorKind::InvalidXBjRange,
                all_rows(matrix),
                format!("x_Bj must lie in {}, got {:e}", range, aux.x_bj),
            ));
        }
        if !self.policy.accepts_c2(aux.c2) {
            return Err(ValidationError::new(
                ValidationErrorKind::InvalidC2,
                all_rows(matrix),
                format!(
                    "c2 must be finite and >= {}, got {}",
                    self.policy.c2_min, aux.c2
                ),
            ));
        }
        Ok(())
    }
}

fn all_rows(matrix: &FeatureMatrix) -> Vec<usize> {
    (0..matrix.rows()).collect()
}

fn append_auxiliary(matrix: &FeatureMatrix, aux: AuxiliaryParams) -> FeatureBatch {
    let mut values = Vec::with_capacity(matrix.rows() * AUGMENTED_WIDTH);
    for record in matrix.iter_rows() {
        values.extend_from_slice(record);
        values.push(aux.c2);
        values.push(aux.x_bj);
    }
    let records = FeatureMatrix::from_row_major(matrix.rows(), AUGMENTED_WIDTH, values)
        .unwrap_or_else(|| unreachable!("appending two columns keeps the matrix rectangular"));
    FeatureBatch::from_validated(records)
}

#[cfg(test)]
mod tests {
    use super::{FeatureValidator, ValidationPolicy};
    use crate::domain::{AuxiliaryParams, ValidationErrorKind};
    use crate::ingest::{IngestedPayload, RawPayload, ingest};

    fn features(value: f64) -> Vec<f64> {
        vec![value; 101]
    }

    fn augmented(value: f64, c2: f64, x_bj: f64) -> Vec<f64> {
        let mut record = features(value);
        record.push(c2);
        record.push(x_bj);
        record
    }

    fn payload(rows: Vec<Vec<f64>>) -> IngestedPayload {
        ingest(&RawPayload::Matrix(rows)).expect("payload should ingest")
    }

    #[test]
    fn bare_rows_receive_supplied_auxiliary_columns() {
        let validator = FeatureValidator::default();
        let batch = validator
            .validate(
                &payload(vec![features(1.0e-3); 5]),
                Some(AuxiliaryParams::new(2.5, 1.0e-3)),
            )
            .expect("batch should validate");

        assert_eq!(batch.len(), 5);
        assert_eq!(batch.width(), 103);
        for index in 0..batch.len() {
            assert_eq!(batch.auxiliary(index), AuxiliaryParams::new(2.5, 1.0e-3));
            assert_eq!(batch.features(index), features(1.0e-3).as_slice());
        }
    }

    #[test]
    fn bare_rows_without_auxiliary_params_are_rejected() {
        let error = FeatureValidator::default()
            .validate(&payload(vec![features(1.0e-3); 2]), None)
            .expect_err("missing aux should fail");
        assert_eq!(error.kind, ValidationErrorKind::MissingAuxiliaryParams);
        assert_eq!(error.offending_rows, vec![0, 1]);
    }

    #[test]
    fn augmented_x_bj_boundaries() {
        let validator = FeatureValidator::default();
        let cases = [
            (1.0e-7, false),
            (1.0000001e-7, true),
            (1.0e-2, true),
            (1.0e-2 * (1.0 + 1.0e-12), false),
            (0.0, false),
            (f64::NAN, false),
        ];

        for (x_bj, accepted) in cases {
            let result = validator.validate(&payload(vec![augmented(1.0e-3, 2.5, x_bj)]), None);
            match (accepted, result) {
                (true, Ok(batch)) => assert_eq!(batch.auxiliary(0).x_bj, x_bj),
                (false, Err(error)) => {
                    assert_eq!(error.kind, ValidationErrorKind::InvalidXBjRange);
                    assert_eq!(error.offending_rows, vec![0]);
                }
                (expected, actual) => panic!("x_Bj={x_bj}: expected {expected}, got {actual:?}"),
            }
        }
    }

    #[test]
    fn supplied_x_bj_of_zero_is_rejected() {
        let error = FeatureValidator::default()
            .validate(
                &payload(vec![features(1.0e-3); 3]),
                Some(AuxiliaryParams::new(2.5, 0.0)),
            )
            .expect_err("x_Bj = 0 should fail");
        assert_eq!(error.kind, ValidationErrorKind::InvalidXBjRange);
        assert_eq!(error.offending_rows, vec![0, 1, 2]);
    }

    #[test]
    fn negative_supplied_c2_is_rejected() {
        let error = FeatureValidator::default()
            .validate(
                &payload(vec![features(1.0e-3)]),
                Some(AuxiliaryParams::new(-0.5, 1.0e-3)),
            )
            .expect_err("negative c2 should fail");
        assert_eq!(error.kind, ValidationErrorKind::InvalidC2);
    }

    #[test]
    fn stored_c2_is_trusted() {
        let batch = FeatureValidator::default()
            .validate(&payload(vec![augmented(1.0e-3, -4.0, 1.0e-3)]), None)
            .expect("stored c2 is not range checked");
        assert_eq!(batch.auxiliary(0).c2, -4.0);
    }

    #[test]
    fn augmented_rows_ignore_external_auxiliary_params() {
        let batch = FeatureValidator::default()
            .validate(
                &payload(vec![augmented(1.0e-3, 1.5, 2.0e-3)]),
                Some(AuxiliaryParams::new(9.0, 0.0)),
            )
            .expect("stored columns should win");
        assert_eq!(batch.auxiliary(0), AuxiliaryParams::new(1.5, 2.0e-3));
    }

    #[test]
    fn every_failing_row_is_reported() {
        let mut rows = vec![features(1.0e-3); 5];
        rows[1][7] = 0.0;
        rows[3][100] = 0.5;
        rows[4][0] = f64::NAN;

        let error = FeatureValidator::default()
            .validate(&payload(rows), Some(AuxiliaryParams::default()))
            .expect_err("bad features should fail");
        assert_eq!(error.kind, ValidationErrorKind::InvalidFeatureRange);
        assert_eq!(error.offending_rows, vec![1, 3, 4]);
        assert!(error.detail.contains("row 1, column 7"));
    }

    #[test]
    fn feature_violations_take_precedence_over_auxiliary_violations() {
        let mut rows = vec![features(1.0e-3); 2];
        rows[0][0] = 1.0;
        let error = FeatureValidator::default()
            .validate(&payload(rows), Some(AuxiliaryParams::new(-1.0, 0.0)))
            .expect_err("batch should fail");
        assert_eq!(error.kind, ValidationErrorKind::InvalidFeatureRange);
        assert_eq!(error.offending_rows, vec![0]);
    }

    #[test]
    fn feature_lower_bound_follows_policy() {
        let rows = vec![features(5.0e-8)];
        let strict = FeatureValidator::default()
            .validate(&payload(rows.clone()), Some(AuxiliaryParams::default()))
            .expect_err("physical policy rejects 5e-8");
        assert_eq!(strict.kind, ValidationErrorKind::InvalidFeatureRange);

        FeatureValidator::new(ValidationPolicy::positive_features())
            .validate(&payload(rows), Some(AuxiliaryParams::default()))
            .expect("positive policy accepts 5e-8");
    }

    #[test]
    fn revalidation_is_idempotent() {
        let validator = FeatureValidator::default();
        let batch = validator
            .validate(
                &payload(vec![features(2.0e-3); 4]),
                Some(AuxiliaryParams::new(0.0, 1.0e-2)),
            )
            .expect("batch should validate");

        let again = validator.revalidate(&batch).expect("revalidation should pass");
        assert_eq!(again, batch);

        let reingested = ingest(&RawPayload::from(batch.as_matrix().clone()))
            .expect("batch should reingest");
        let third = validator
            .validate(&reingested, None)
            .expect("reingested batch should validate");
        assert_eq!(third, batch);
    }
}
