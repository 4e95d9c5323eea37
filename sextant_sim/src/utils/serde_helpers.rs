// sextant_sim/src/utils/serde_helpers.rs

/// A `Pose2` written in scenario files as `[x, y, heading_deg]`.
pub mod pose_from_deg_array {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use sextant_core::geometry::Pose2;

    pub fn serialize<S>(pose: &Pose2, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let arr = [pose.x(), pose.y(), pose.heading().to_degrees()];
        serializer.collect_seq(arr.iter())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Pose2, D::Error>
    where
        D: Deserializer<'de>,
    {
        let arr: [f64; 3] = Deserialize::deserialize(deserializer)?;
        Ok(Pose2::new(arr[0], arr[1], arr[2].to_radians()))
    }
}

/// An angle written in degrees and held in radians.
pub mod radians_from_deg {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(radians: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(radians.to_degrees())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let degrees: f64 = Deserialize::deserialize(deserializer)?;
        Ok(degrees.to_radians())
    }
}
