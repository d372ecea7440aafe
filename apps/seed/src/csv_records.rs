use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tally_core::{AppError, AppResult};
use tally_domain::{EmailAddress, PointsAccount, PointsAccountId, RoleName, User, UserId};

#[derive(Debug, Deserialize)]
struct UserCsvRow {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
    #[serde(default)]
    role: Option<String>,
}

impl TryFrom<UserCsvRow> for User {
    type Error = AppError;

    fn try_from(row: UserCsvRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .filter(|value| !value.trim().is_empty())
            .map(RoleName::new)
            .transpose()?;

        Ok(Self::new(
            UserId::new(row.id)?,
            EmailAddress::new(row.email)?,
            row.first_name,
            row.last_name,
            role,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct PointsCsvRow {
    id: String,
    user_id: String,
    balance: i32,
}

impl TryFrom<PointsCsvRow> for PointsAccount {
    type Error = AppError;

    fn try_from(row: PointsCsvRow) -> Result<Self, Self::Error> {
        Self::new(
            PointsAccountId::new(row.id)?,
            UserId::new(row.user_id)?,
            row.balance,
        )
    }
}

/// Reads `users.csv` rows: `id,email,first_name,last_name[,role]`.
pub fn read_users(reader: impl Read, source: &str) -> AppResult<Vec<User>> {
    read_rows::<UserCsvRow, User>(reader, source)
}

/// Reads `points.csv` rows: `id,user_id,balance`.
pub fn read_points(reader: impl Read, source: &str) -> AppResult<Vec<PointsAccount>> {
    read_rows::<PointsCsvRow, PointsAccount>(reader, source)
}

pub fn open(path: &Path) -> AppResult<File> {
    File::open(path).map_err(|error| {
        AppError::Validation(format!("failed to open '{}': {error}", path.display()))
    })
}

fn read_rows<Row, Record>(reader: impl Read, source: &str) -> AppResult<Vec<Record>>
where
    Row: DeserializeOwned,
    Record: TryFrom<Row, Error = AppError>,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<Row>().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = row.map_err(|error| {
            AppError::Validation(format!("{source} line {line}: malformed row: {error}"))
        })?;
        let record = Record::try_from(row).map_err(|error| {
            AppError::Validation(format!("{source} line {line}: {error}"))
        })?;
        records.push(record);
    }

    Ok(records)
}
