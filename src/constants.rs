//! Column names used by the transform so every stage agrees on spelling.

// Raw source columns
pub const TRANS_DATE_TRANS_TIME: &str = "trans_date_trans_time";
pub const CC_NUM: &str = "cc_num";
pub const MERCHANT: &str = "merchant";
pub const CATEGORY: &str = "category";
pub const AMT: &str = "amt";
pub const GENDER: &str = "gender";
pub const STREET: &str = "street";
pub const CITY: &str = "city";
pub const STATE: &str = "state";
pub const ZIP: &str = "zip";
pub const LAT: &str = "lat";
pub const LONG: &str = "long";
pub const CITY_POP: &str = "city_pop";
pub const JOB: &str = "job";
pub const DOB: &str = "dob";
pub const UNIX_TIME: &str = "unix_time";
pub const MERCH_LAT: &str = "merch_lat";
pub const MERCH_LONG: &str = "merch_long";
pub const IS_FRAUD: &str = "is_fraud";

// Columns created by the transform
pub const TARGET: &str = "Target";
pub const TRANS_DATE: &str = "trans_date";
pub const TRANS_TIME: &str = "trans_time";
pub const LOCATION: &str = "location";

/// Every column the extractor insists on.
pub const REQUIRED_RAW_COLUMNS: [&str; 19] = [
    TRANS_DATE_TRANS_TIME,
    CC_NUM,
    MERCHANT,
    CATEGORY,
    AMT,
    GENDER,
    STREET,
    CITY,
    STATE,
    ZIP,
    LAT,
    LONG,
    CITY_POP,
    JOB,
    DOB,
    UNIX_TIME,
    MERCH_LAT,
    MERCH_LONG,
    IS_FRAUD,
];

/// Header names a dataframe export gives its leading row-index column.
pub const INDEX_ARTIFACT_COLUMNS: [&str; 3] = ["_c0", "Unnamed: 0", ""];

pub const FLOAT_COLUMNS: [&str; 5] = [AMT, MERCH_LAT, MERCH_LONG, LAT, LONG];
pub const INTEGER_COLUMNS: [&str; 5] = [ZIP, GENDER, CITY_POP, UNIX_TIME, TARGET];
pub const DROPPED_COLUMNS: [&str; 4] = [TRANS_DATE_TRANS_TIME, CITY_POP, CITY, STATE];
pub const ENCODED_COLUMNS: [&str; 6] = [JOB, CC_NUM, MERCHANT, STREET, CATEGORY, LOCATION];

pub const TRANSACTION_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Layouts tried, in order, on the first date of birth value. Slash dates
/// are month-first unless the day cannot be a month.
pub const DOB_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M",
];
pub const DOB_DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

pub const NOTIFICATION_SUBJECT: &str = "ETL Process Completed";
pub const NOTIFICATION_HTML: &str = "<h3>Your ETL process has been completed successfully!</h3>\n<p>The data has been loaded into the destination.</p>";

pub const DEFAULT_SOURCE_PATH: &str = "fraud test.csv";
pub const DEFAULT_DATABASE_PATH: &str = "data/fraud_etl.db";
pub const DEFAULT_TABLE: &str = "transactions";
pub const RUN_LEDGER_TABLE: &str = "etl_runs";
