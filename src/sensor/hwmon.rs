/// Linux hwmon-backed thermocouple adapter
///
/// Reads the cold-junction and probe channels from sysfs temperature files
/// (millidegrees Celsius, one integer per file), the layout exposed by
/// thermocouple frontends such as MAX31855/MAX31856 drivers.
use super::probe::ProbeSensor;
use crate::models::RawSample;

pub struct HwmonProbe {
    cold_junction_path: String,
    probe_path: String,
    supply_voltage: f64,
}

impl HwmonProbe {
    pub fn new(cold_junction_path: String, probe_path: String, supply_voltage: f64) -> Self {
        HwmonProbe {
            cold_junction_path,
            probe_path,
            supply_voltage,
        }
    }

    async fn read_millidegrees(path: &str) -> Result<f64, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read {}: {}", path, e))?;
        let millidegrees: f64 = contents
            .trim()
            .parse()
            .map_err(|e| format!("Invalid reading in {}: {}", path, e))?;
        Ok(millidegrees / 1000.0)
    }
}

impl ProbeSensor for HwmonProbe {
    async fn read_raw(&mut self) -> Result<RawSample, String> {
        let cold_junction = Self::read_millidegrees(&self.cold_junction_path).await?;
        let probe = Self::read_millidegrees(&self.probe_path).await?;
        Ok(RawSample {
            cold_junction,
            probe,
            supply_voltage: self.supply_voltage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_millidegree_files() {
        let path = std::env::temp_dir().join("thermoprobe_hwmon_test");
        tokio::fs::write(&path, "25500\n").await.unwrap();

        let value = HwmonProbe::read_millidegrees(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(value, 25.5);

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn rejects_non_numeric_contents() {
        let path = std::env::temp_dir().join("thermoprobe_hwmon_bad");
        tokio::fs::write(&path, "not-a-number\n").await.unwrap();

        let result = HwmonProbe::read_millidegrees(path.to_str().unwrap()).await;
        assert!(result.is_err());

        tokio::fs::remove_file(&path).await.ok();
    }
}
