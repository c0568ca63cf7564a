use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::Serialize;
use thiserror::Error;

use crate::config::{Columns, Config, ConfigError, InvalidRecords};
use crate::model::{InvalidInput, Observation, PetEstimate};
use crate::radiation::RadiationUnits;
use crate::summary::DailyPet;

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];
const DATE_FORMAT: &str = "%Y-%m-%d";
const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum IoError {
    #[error("Could not open CSV file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Error reading CSV data in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Column '{column}' not found in header of {path}")]
    MissingColumn { path: PathBuf, column: String },
    #[error("Could not create output file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Error writing {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// One data row of the input file.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRow {
    /// 1-based line in the source file
    pub line: u64,
    /// `None` when the timestamp cell could not be parsed
    pub timestamp: Option<NaiveDateTime>,
    pub raw_timestamp: String,
    pub observation: Result<Observation, InvalidInput>,
}

/// One row of the output table.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub timestamp: Option<NaiveDateTime>,
    pub raw_timestamp: String,
    pub estimate: Result<PetEstimate, InvalidInput>,
}

impl OutputRow {
    pub fn estimated(&self) -> Option<&PetEstimate> {
        self.estimate.as_ref().ok()
    }

    /// Timestamp in the output layout; the raw cell only when it never parsed.
    fn timestamp_text(&self) -> String {
        match &self.timestamp {
            Some(timestamp) => format_timestamp(timestamp),
            None => self.raw_timestamp.clone(),
        }
    }
}

struct ColumnIndex {
    timestamp: usize,
    air_temperature: usize,
    net_radiation: Option<usize>,
    solar_radiation: Option<usize>,
    extraterrestrial_radiation: Option<usize>,
    relative_humidity: Option<usize>,
    pressure: Option<usize>,
    soil_heat_flux: Option<usize>,
    surface_temperature: Option<usize>,
    surface_humidity: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(
        headers: &StringRecord,
        columns: &Columns,
        path: &Path,
    ) -> Result<Self, IoError> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let required = |name: &str| {
            find(name).ok_or_else(|| IoError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
        };
        Ok(ColumnIndex {
            timestamp: required(&columns.timestamp)?,
            air_temperature: required(&columns.air_temperature)?,
            net_radiation: find(&columns.net_radiation),
            solar_radiation: find(&columns.solar_radiation),
            extraterrestrial_radiation: find(&columns.extraterrestrial_radiation),
            relative_humidity: find(&columns.relative_humidity),
            pressure: find(&columns.pressure),
            soil_heat_flux: find(&columns.soil_heat_flux),
            surface_temperature: find(&columns.surface_temperature),
            surface_humidity: find(&columns.surface_humidity),
        })
    }
}

/// Parse a timestamp with the configured format, or the common layouts.
pub fn parse_timestamp(value: &str, format: Option<&str>) -> Result<NaiveDateTime, InvalidInput> {
    let unparsable = || InvalidInput::Unparsable {
        field: "timestamp",
        value: value.to_string(),
    };
    if let Some(format) = format {
        return NaiveDateTime::parse_from_str(value, format)
            .or_else(|_| {
                NaiveDate::parse_from_str(value, format)
                    .map(|date| date.and_time(Default::default()))
            })
            .map_err(|_| unparsable());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .map(|date| date.and_time(Default::default()))
        })
        .ok_or_else(unparsable)
}

struct RowParser<'a> {
    record: &'a StringRecord,
    null_markers: &'a [String],
}

impl RowParser<'_> {
    fn value(
        &self,
        field: &'static str,
        index: Option<usize>,
    ) -> Result<Option<f64>, InvalidInput> {
        let Some(raw) = index.and_then(|i| self.record.get(i)) else {
            return Ok(None);
        };
        let raw = raw.trim();
        let parsed = raw.parse::<f64>().ok();
        if self.is_null(raw, parsed) {
            return Ok(None);
        }
        match parsed {
            Some(value) => Ok(Some(value)),
            None => Err(InvalidInput::Unparsable {
                field,
                value: raw.to_string(),
            }),
        }
    }

    /// Markers match their exact text, and numeric markers also match the
    /// same number written differently (`-9999.0` for `-9999`).
    fn is_null(&self, raw: &str, parsed: Option<f64>) -> bool {
        let same = |marker: &String| parsed.is_some_and(|v| marker.parse::<f64>() == Ok(v));
        self.null_markers
            .iter()
            .any(|marker| marker == raw || same(marker))
    }

    fn radiation(
        &self,
        field: &'static str,
        index: Option<usize>,
        units: RadiationUnits,
    ) -> Result<Option<f64>, InvalidInput> {
        let value = self.value(field, index)?;
        Ok(value.map(|value| units.to_mj_per_m2_day(value)))
    }
}

fn parse_observation(
    record: &StringRecord,
    columns: &ColumnIndex,
    config: &Config,
    timestamp: NaiveDateTime,
) -> Result<Observation, InvalidInput> {
    let row = RowParser {
        record,
        null_markers: &config.null_markers,
    };
    let units = config.radiation_units;
    let air_temperature = row.value("air_temperature", Some(columns.air_temperature))?;
    let air_temperature = air_temperature.ok_or(InvalidInput::Missing("air_temperature"))?;

    Ok(Observation {
        timestamp,
        air_temperature,
        net_radiation: row.radiation("net_radiation", columns.net_radiation, units)?,
        solar_radiation: row.radiation("solar_radiation", columns.solar_radiation, units)?,
        extraterrestrial_radiation: row.radiation(
            "extraterrestrial_radiation",
            columns.extraterrestrial_radiation,
            units,
        )?,
        relative_humidity: row.value("relative_humidity", columns.relative_humidity)?,
        pressure: row.value("pressure", columns.pressure)?,
        soil_heat_flux: row.radiation("soil_heat_flux", columns.soil_heat_flux, units)?,
        surface_temperature: row.value("surface_temperature", columns.surface_temperature)?,
        surface_humidity: row.value("surface_humidity", columns.surface_humidity)?,
    })
}

/// Read every data row of a CSV file.
///
/// Rows that cannot be turned into an [`Observation`] are returned with the
/// reason instead of aborting the read; only an unreadable file, a header
/// without the mandatory columns or an I/O failure is fatal.
pub fn read_observations(path: &Path, config: &Config) -> Result<Vec<InputRow>, IoError> {
    let delimiter = config.delimiter_byte()?;
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|source| IoError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let headers = reader.headers().map_err(|source| IoError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    let columns = ColumnIndex::from_headers(headers, &config.columns, path)?;
    let timestamp_format = config.timestamp_format.as_deref();

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(source) if source.is_io_error() => {
                return Err(IoError::Csv {
                    path: path.to_path_buf(),
                    source,
                });
            }
            Err(source) => {
                let line = source
                    .position()
                    .map_or(i as u64 + 2, |position| position.line());
                rows.push(InputRow {
                    line,
                    timestamp: None,
                    raw_timestamp: String::new(),
                    observation: Err(InvalidInput::Unparsable {
                        field: "record",
                        value: source.to_string(),
                    }),
                });
                continue;
            }
        };
        let line = record
            .position()
            .map_or(i as u64 + 2, |position| position.line());
        let raw_timestamp = record.get(columns.timestamp).unwrap_or_default();
        let timestamp = parse_timestamp(raw_timestamp, timestamp_format);
        let observation = match &timestamp {
            Ok(timestamp) => parse_observation(&record, &columns, config, *timestamp),
            Err(reason) => Err(reason.clone()),
        };
        rows.push(InputRow {
            line,
            timestamp: timestamp.ok(),
            raw_timestamp: raw_timestamp.to_string(),
            observation,
        });
    }
    Ok(rows)
}

#[derive(Serialize)]
struct EstimateRecord {
    timestamp: String,
    pet: f64,
}

#[derive(Serialize)]
struct FlaggedRecord {
    timestamp: String,
    pet: Option<f64>,
    flag: String,
}

/// Write the estimates table. Rejected rows are dropped or flagged per `policy`.
pub fn write_estimates(
    path: &Path,
    rows: &[OutputRow],
    policy: InvalidRecords,
    delimiter: u8,
) -> Result<usize, IoError> {
    let mut writer = create_writer(path, delimiter)?;
    let write_err = |source| IoError::Write {
        path: path.to_path_buf(),
        source,
    };
    let header: &[&str] = match policy {
        InvalidRecords::Skip => &["timestamp", "pet"],
        InvalidRecords::Flag => &["timestamp", "pet", "flag"],
    };
    writer.write_record(header).map_err(write_err)?;

    let mut written = 0;
    for row in rows {
        match (&row.estimate, policy) {
            (Ok(estimate), InvalidRecords::Skip) => {
                writer
                    .serialize(EstimateRecord {
                        timestamp: format_timestamp(&estimate.timestamp),
                        pet: estimate.pet,
                    })
                    .map_err(write_err)?;
            }
            (Ok(estimate), InvalidRecords::Flag) => {
                writer
                    .serialize(FlaggedRecord {
                        timestamp: format_timestamp(&estimate.timestamp),
                        pet: Some(estimate.pet),
                        flag: String::new(),
                    })
                    .map_err(write_err)?;
            }
            (Err(_), InvalidRecords::Skip) => continue,
            (Err(reason), InvalidRecords::Flag) => {
                writer
                    .serialize(FlaggedRecord {
                        timestamp: row.timestamp_text(),
                        pet: None,
                        flag: reason.to_string(),
                    })
                    .map_err(write_err)?;
            }
        }
        written += 1;
    }
    writer
        .flush()
        .map_err(|err| write_err(csv::Error::from(err)))?;
    Ok(written)
}

/// Write the daily summary table.
pub fn write_daily(path: &Path, days: &[DailyPet], delimiter: u8) -> Result<(), IoError> {
    let mut writer = create_writer(path, delimiter)?;
    let write_err = |source| IoError::Write {
        path: path.to_path_buf(),
        source,
    };
    writer
        .write_record(["date", "pet", "count"])
        .map_err(write_err)?;
    for day in days {
        writer.serialize(day).map_err(write_err)?;
    }
    writer
        .flush()
        .map_err(|err| write_err(csv::Error::from(err)))
}

fn create_writer(path: &Path, delimiter: u8) -> Result<csv::Writer<std::fs::File>, IoError> {
    WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_path(path)
        .map_err(|source| IoError::Create {
            path: path.to_path_buf(),
            source,
        })
}

fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(OUTPUT_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::W_M2_TO_MJ_M2_DAY;
    use approx::assert_abs_diff_eq;
    use std::fs;

    fn write_csv(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn parses_supported_timestamp_layouts() {
        let expected = at(2018, 6, 1, 10, 30);
        let midnight = at(2018, 6, 1, 0, 0);
        assert_eq!(parse_timestamp("2018-06-01 10:30", None), Ok(expected));
        assert_eq!(parse_timestamp("2018-06-01 10:30:00", None), Ok(expected));
        assert_eq!(parse_timestamp("2018-06-01T10:30:00", None), Ok(expected));
        assert_eq!(parse_timestamp("2018-06-01", None), Ok(midnight));
        assert_eq!(
            parse_timestamp("01/06/2018 10:30", Some("%d/%m/%Y %H:%M")),
            Ok(expected)
        );
        assert_eq!(
            parse_timestamp("01/06/2018", Some("%d/%m/%Y")),
            Ok(at(2018, 6, 1, 0, 0))
        );
        assert!(matches!(
            parse_timestamp("June 1st", None),
            Err(InvalidInput::Unparsable { field: "timestamp", .. })
        ));
    }

    #[test]
    fn reads_rows_and_keeps_bad_ones_with_a_reason() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "obs.csv",
            "timestamp,air_temperature,net_radiation,relative_humidity\n\
             2018-06-01 00:00,21.5,12.0,70\n\
             2018-06-02 00:00,abc,12.0,70\n\
             2018-06-03 00:00,,11.0,NA\n\
             not a date,20.0,10.0,65\n\
             2018-06-05 00:00,19.0,-9999,60\n",
        );
        let rows = read_observations(&path, &Config::default()).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(
            rows.iter().map(|r| r.line).collect::<Vec<_>>(),
            vec![2, 3, 4, 5, 6]
        );

        let first = rows[0].observation.as_ref().unwrap();
        assert_eq!(first.timestamp, at(2018, 6, 1, 0, 0));
        assert_eq!(first.air_temperature, 21.5);
        assert_eq!(first.net_radiation, Some(12.0));
        assert_eq!(first.relative_humidity, Some(70.));
        assert_eq!(first.pressure, None);

        assert_eq!(
            rows[1].observation,
            Err(InvalidInput::Unparsable {
                field: "air_temperature",
                value: "abc".to_string()
            })
        );
        assert_eq!(rows[1].timestamp, Some(at(2018, 6, 2, 0, 0)));
        assert_eq!(
            rows[2].observation,
            Err(InvalidInput::Missing("air_temperature"))
        );
        assert!(matches!(
            rows[3].observation,
            Err(InvalidInput::Unparsable { field: "timestamp", .. })
        ));
        assert_eq!(rows[3].timestamp, None);
        assert_eq!(rows[3].raw_timestamp, "not a date");
        assert_eq!(rows[4].observation.as_ref().unwrap().net_radiation, None);
    }

    #[test]
    fn numeric_null_markers_match_any_spelling() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "obs.csv",
            "timestamp,air_temperature,net_radiation,relative_humidity\n\
             2018-06-01 00:00,21.5,-9999.0,-9999.00\n\
             2018-06-02 00:00,21.5,-9999.5,NA\n",
        );
        let rows = read_observations(&path, &Config::default()).unwrap();
        let first = rows[0].observation.as_ref().unwrap();
        assert_eq!(first.net_radiation, None);
        assert_eq!(first.relative_humidity, None);
        let second = rows[1].observation.as_ref().unwrap();
        assert_eq!(second.net_radiation, Some(-9999.5));
    }

    #[test]
    fn converts_watts_and_honours_column_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "obs.csv", "date;TA;RN\n2018-07-01 12:00;25.0;100\n");
        let mut config = Config::default();
        config.delimiter = ";".to_string();
        config.radiation_units = RadiationUnits::WPerM2;
        config.columns.timestamp = "date".to_string();
        config.columns.air_temperature = "TA".to_string();
        config.columns.net_radiation = "RN".to_string();

        let rows = read_observations(&path, &config).unwrap();
        let observation = rows[0].observation.as_ref().unwrap();
        assert!((observation.net_radiation.unwrap() - 8.64).abs() < 1e-12);
    }

    #[test]
    fn maps_every_column_to_its_field() {
        let dir = tempfile::tempdir().unwrap();
        // header order deliberately differs from the field order
        let path = write_csv(
            &dir,
            "obs.csv",
            "surface_humidity,pressure,soil_heat_flux,timestamp,extraterrestrial_radiation,\
             relative_humidity,net_radiation,surface_temperature,air_temperature,\
             solar_radiation\n\
             95,98.5,50,2018-07-01 12:00,1200,60,500,22.5,25.0,700\n",
        );
        let config = Config {
            radiation_units: RadiationUnits::WPerM2,
            ..Config::default()
        };

        let rows = read_observations(&path, &config).unwrap();
        let obs = rows[0].observation.as_ref().unwrap();
        assert_eq!(obs.timestamp, at(2018, 7, 1, 12, 0));
        assert_eq!(obs.air_temperature, 25.);
        assert_eq!(obs.relative_humidity, Some(60.));
        assert_eq!(obs.pressure, Some(98.5));
        assert_eq!(obs.surface_temperature, Some(22.5));
        assert_eq!(obs.surface_humidity, Some(95.));
        // radiation and ground flux columns are converted from W m^-2
        assert_abs_diff_eq!(obs.net_radiation.unwrap(), 43.2, epsilon = 1e-9);
        assert_abs_diff_eq!(obs.solar_radiation.unwrap(), 60.48, epsilon = 1e-9);
        assert_abs_diff_eq!(obs.soil_heat_flux.unwrap(), 4.32, epsilon = 1e-9);
        assert_abs_diff_eq!(
            obs.extraterrestrial_radiation.unwrap(),
            1200. * W_M2_TO_MJ_M2_DAY,
            epsilon = 1e-9
        );
    }

    #[test]
    fn short_rows_are_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "obs.csv",
            "timestamp,air_temperature,net_radiation\n2018-07-01,25.0\n",
        );
        let rows = read_observations(&path, &Config::default()).unwrap();
        assert_eq!(rows[0].observation.as_ref().unwrap().net_radiation, None);
    }

    #[test]
    fn missing_mandatory_column_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "obs.csv", "timestamp,net_radiation\n2018-07-01,5\n");
        let err = read_observations(&path, &Config::default()).unwrap_err();
        assert!(matches!(
            err,
            IoError::MissingColumn { ref column, .. } if column == "air_temperature"
        ));
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        let err = read_observations(&path, &Config::default()).unwrap_err();
        assert!(matches!(err, IoError::Open { .. }));
    }

    fn output_rows() -> Vec<OutputRow> {
        vec![
            OutputRow {
                timestamp: Some(at(2018, 6, 1, 0, 0)),
                raw_timestamp: "2018-06-01 00:00".to_string(),
                estimate: Ok(PetEstimate {
                    timestamp: at(2018, 6, 1, 0, 0),
                    pet: 4.25,
                }),
            },
            OutputRow {
                timestamp: Some(at(2018, 6, 2, 0, 0)),
                raw_timestamp: "2018-06-02 00:00".to_string(),
                estimate: Err(InvalidInput::Missing("net_radiation")),
            },
            OutputRow {
                timestamp: None,
                raw_timestamp: "not a date".to_string(),
                estimate: Err(InvalidInput::Unparsable {
                    field: "timestamp",
                    value: "not a date".to_string(),
                }),
            },
        ]
    }

    #[test]
    fn skip_policy_writes_only_estimates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pet.csv");
        let rows = output_rows();
        let written = write_estimates(&path, &rows, InvalidRecords::Skip, b',').unwrap();
        assert_eq!(written, 1);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "timestamp,pet\n2018-06-01 00:00:00,4.25\n"
        );
    }

    #[test]
    fn header_is_written_even_without_estimates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pet.csv");
        let written = write_estimates(&path, &[], InvalidRecords::Skip, b',').unwrap();
        assert_eq!(written, 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "timestamp,pet\n");
    }

    #[test]
    fn flag_policy_keeps_rejected_rows_in_the_output_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pet.csv");
        let rows = output_rows();
        let written = write_estimates(&path, &rows, InvalidRecords::Flag, b',').unwrap();
        assert_eq!(written, 3);
        // only a timestamp that never parsed is written as it was read
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "timestamp,pet,flag\n\
             2018-06-01 00:00:00,4.25,\n\
             2018-06-02 00:00:00,,missing value for 'net_radiation'\n\
             not a date,,could not parse 'not a date' for 'timestamp'\n"
        );
    }
}
