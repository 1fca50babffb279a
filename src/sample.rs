use crate::error::SampleError;

/// One decoded telemetry record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Seconds since the controller booted.
    pub time_s: f64,
    /// Pendulum angle in degrees.
    pub angle: f64,
}

impl Sample {
    /// Decode `<millis> <angle>`. Tokens are whitespace separated; anything
    /// after the second token is ignored.
    pub fn parse(line: &str) -> Result<Self, SampleError> {
        let mut tokens = line.split_whitespace();
        let (Some(millis), Some(angle)) = (tokens.next(), tokens.next()) else {
            return Err(SampleError::MissingField {
                line: line.to_string(),
            });
        };

        let millis: i64 = millis.parse().map_err(|source| SampleError::BadTimestamp {
            token: millis.to_string(),
            source,
        })?;
        let angle: f64 = angle.parse().map_err(|source| SampleError::BadAngle {
            token: angle.to_string(),
            source,
        })?;

        Ok(Self {
            time_s: millis as f64 / 1000.0,
            angle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_millis_and_angle() {
        assert_eq!(
            Sample::parse("1000 45.5").unwrap(),
            Sample { time_s: 1.0, angle: 45.5 }
        );
        assert_eq!(
            Sample::parse("  2500\t-179.25  ").unwrap(),
            Sample { time_s: 2.5, angle: -179.25 }
        );
    }

    #[test]
    fn extra_tokens_are_ignored() {
        let s = Sample::parse("20 3 extra").unwrap();
        assert_eq!(s, Sample { time_s: 0.02, angle: 3.0 });
    }

    #[test]
    fn single_token_is_missing_field() {
        assert_eq!(
            Sample::parse("1000"),
            Err(SampleError::MissingField { line: "1000".into() })
        );
        assert!(matches!(Sample::parse(""), Err(SampleError::MissingField { .. })));
    }

    #[test]
    fn fractional_timestamp_is_rejected() {
        assert!(matches!(
            Sample::parse("1000.5 45"),
            Err(SampleError::BadTimestamp { .. })
        ));
    }

    #[test]
    fn non_numeric_angle_is_rejected() {
        match Sample::parse("1000 up") {
            Err(SampleError::BadAngle { token, .. }) => assert_eq!(token, "up"),
            other => panic!("expected BadAngle, got {other:?}"),
        }
    }
}
