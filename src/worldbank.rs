//! Dataset generation from the World Bank API.
//!
//! One request pulls the GDP indicator (current US$) for every country and
//! year in range; rows are filtered down to the tracked countries, converted
//! to billions, styled, and written out as the race dataset. English names
//! come from the API itself; Chinese names, flag codes and colors come from
//! the static table here.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    core::{Iso3, Year},
    dataset::GdpRecord,
    error::{RaceError, RaceResult},
};

const API_BASE: &str = "https://api.worldbank.org/v2";
const INDICATOR: &str = "NY.GDP.MKTP.CD";
const FLAG_BASE: &str = "https://flagcdn.com/w80";

pub const DEFAULT_START_YEAR: Year = Year(1960);
pub const DEFAULT_END_YEAR: Year = Year(2023);

/// (iso3, iso2 for flag URLs, Chinese name, flag-dominant color).
const COUNTRY_STYLES: &[(&str, &str, &str, &str)] = &[
    ("USA", "us", "美国", "#B22234"),
    ("CHN", "cn", "中国", "#EE1C25"),
    ("JPN", "jp", "日本", "#BC002D"),
    ("DEU", "de", "德国", "#FFCE00"),
    ("IND", "in", "印度", "#FF9933"),
    ("GBR", "gb", "英国", "#012169"),
    ("FRA", "fr", "法国", "#00209F"),
    ("ITA", "it", "意大利", "#008C45"),
    ("BRA", "br", "巴西", "#009739"),
    ("CAN", "ca", "加拿大", "#FF0000"),
    ("RUS", "ru", "俄罗斯", "#0039A6"),
    ("KOR", "kr", "韩国", "#000000"),
    ("AUS", "au", "澳大利亚", "#00008B"),
    ("ESP", "es", "西班牙", "#FABD00"),
    ("MEX", "mx", "墨西哥", "#006847"),
    ("IDN", "id", "印尼", "#FF0000"),
    ("NLD", "nl", "荷兰", "#AE1C28"),
    ("SAU", "sa", "沙特", "#006C35"),
    ("TUR", "tr", "土耳其", "#E30A17"),
    ("CHE", "ch", "瑞士", "#FF0000"),
    ("POL", "pl", "波兰", "#DC143C"),
    ("ARG", "ar", "阿根廷", "#74ACDF"),
    ("SWE", "se", "瑞典", "#006AA7"),
    ("BEL", "be", "比利时", "#000000"),
    ("THA", "th", "泰国", "#2D2A4A"),
    ("AUT", "at", "奥地利", "#ED2939"),
    ("IRN", "ir", "伊朗", "#239f40"),
    ("NOR", "no", "挪威", "#BA0C2F"),
    ("ARE", "ae", "阿联酋", "#FF0000"),
    ("NGA", "ng", "尼日利亚", "#008751"),
    ("EGY", "eg", "埃及", "#C8102E"),
    ("ZAF", "za", "南非", "#007A4D"),
    ("PHL", "ph", "菲律宾", "#0038A8"),
    ("SGP", "sg", "新加坡", "#ED2939"),
    ("MYS", "my", "马来西亚", "#010066"),
    ("DNK", "dk", "丹麦", "#C60C30"),
    ("COL", "co", "哥伦比亚", "#FCD116"),
    ("CHL", "cl", "智利", "#0039A6"),
    ("FIN", "fi", "芬兰", "#003580"),
    ("GRC", "gr", "希腊", "#005BAE"),
    ("PRT", "pt", "葡萄牙", "#FF0000"),
    ("CZE", "cz", "捷克", "#11457E"),
    ("ROU", "ro", "罗马尼亚", "#002B7F"),
    ("NZL", "nz", "新西兰", "#00247D"),
    ("VEN", "ve", "委内瑞拉", "#FFCC00"),
    ("IRQ", "iq", "伊拉克", "#FF0000"),
    ("KAZ", "kz", "哈萨克斯坦", "#00AFCA"),
    ("DZA", "dz", "阿尔及利亚", "#006233"),
    ("QAT", "qa", "卡塔尔", "#8D1B3D"),
    ("ISR", "il", "以色列", "#0038B8"),
    ("KWT", "kw", "科威特", "#000000"),
    ("HUN", "hu", "匈牙利", "#436F4D"),
    ("UKR", "ua", "乌克兰", "#FFD700"),
    ("MAR", "ma", "摩洛哥", "#C1272D"),
    ("ECU", "ec", "厄瓜多尔", "#FFDD00"),
    ("LUX", "lu", "卢森堡", "#EA1423"),
    ("OMN", "om", "阿曼", "#EB192E"),
    ("LBY", "ly", "利比亚", "#239E46"),
    ("PER", "pe", "秘鲁", "#D91023"),
    ("MMR", "mm", "缅甸", "#FECB00"),
    ("ETH", "et", "埃塞俄比亚", "#078930"),
    ("GHA", "gh", "加纳", "#CF0921"),
    ("KEN", "ke", "肯尼亚", "#000000"),
    ("CUB", "cu", "古巴", "#CB1515"),
    ("GTM", "gt", "危地马拉", "#4997D0"),
    ("PAN", "pa", "巴拿马", "#005293"),
    ("URY", "uy", "乌拉圭", "#0038A8"),
    ("DOM", "do", "多米尼加", "#002D62"),
    ("CRI", "cr", "哥斯达黎加", "#EF3340"),
    ("BGR", "bg", "保加利亚", "#00966E"),
    ("HRV", "hr", "克罗地亚", "#FF0000"),
    ("SVK", "sk", "斯洛伐克", "#0B4EA2"),
    ("SRB", "rs", "塞尔维亚", "#C6363C"),
    ("BLR", "by", "白俄罗斯", "#C83728"),
    ("AZE", "az", "阿塞拜疆", "#00B5E2"),
    ("LKA", "lk", "斯里兰卡", "#FFBE29"),
    ("CIV", "ci", "科特迪瓦", "#FF8200"),
    ("TZA", "tz", "坦桑尼亚", "#1EB53A"),
    ("JOR", "jo", "约旦", "#CE1126"),
    ("TUN", "tn", "突尼斯", "#E70013"),
    ("COD", "cd", "刚果(金)", "#007FFF"),
    ("CMR", "cm", "喀麦隆", "#007A5E"),
    ("BOL", "bo", "玻利维亚", "#007A33"),
    ("PRY", "py", "巴拉圭", "#0038A8"),
    ("SDN", "sd", "苏丹", "#D21034"),
    ("NPL", "np", "尼泊尔", "#DC143C"),
    ("HND", "hn", "洪都拉斯", "#0073CF"),
    ("NIC", "ni", "尼加拉瓜", "#0067C6"),
    ("SLV", "sv", "萨尔瓦多", "#0047AB"),
    ("AFG", "af", "阿富汗", "#BF0000"),
    ("BGD", "bd", "孟加拉国", "#006A4E"),
    ("VNM", "vn", "越南", "#DA251D"),
    ("PAK", "pk", "巴基斯坦", "#00401A"),
    ("IRL", "ie", "爱尔兰", "#169B62"),
    ("ISL", "is", "冰岛", "#003897"),
    ("EST", "ee", "爱沙尼亚", "#0072CE"),
    ("LVA", "lv", "拉脱维亚", "#9E3039"),
    ("LTU", "lt", "立陶宛", "#FDB913"),
    ("SVN", "si", "斯洛文尼亚", "#005BAE"),
];

/// Pagination header of a World Bank response.
#[derive(Debug, serde::Deserialize)]
struct WbPage {
    page: u32,
    pages: u32,
    total: u64,
}

#[derive(Debug, serde::Deserialize)]
struct WbCountry {
    /// English display name.
    value: String,
}

#[derive(Debug, serde::Deserialize)]
struct WbRow {
    country: WbCountry,
    countryiso3code: String,
    date: String,
    value: Option<f64>,
}

/// What to fetch and where the dataset goes.
#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub start_year: Year,
    pub end_year: Year,
    pub out_path: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            start_year: DEFAULT_START_YEAR,
            end_year: DEFAULT_END_YEAR,
            out_path: PathBuf::from("gdp_data.json"),
        }
    }
}

fn indicator_url(cfg: &FetchConfig) -> String {
    format!(
        "{API_BASE}/country/all/indicator/{INDICATOR}?format=json&per_page=20000&date={}:{}",
        cfg.start_year, cfg.end_year
    )
}

fn parse_envelope(body: &str) -> RaceResult<(WbPage, Vec<WbRow>)> {
    serde_json::from_str(body)
        .map_err(|e| RaceError::serde(format!("world bank response did not parse: {e}")))
}

/// Filters API rows down to tracked countries with data, converts values to
/// billions and attaches styling. Output is sorted by year, then value
/// descending within a year.
fn transform(rows: Vec<WbRow>) -> Vec<GdpRecord> {
    let styles: HashMap<&str, &(&str, &str, &str, &str)> =
        COUNTRY_STYLES.iter().map(|s| (s.0, s)).collect();

    let mut skipped = 0usize;
    let mut records = Vec::new();
    for row in rows {
        let Some(&&(_, iso2, name_cn, color)) = styles.get(row.countryiso3code.as_str()) else {
            skipped += 1;
            continue;
        };
        let Some(value) = row.value else {
            skipped += 1;
            continue;
        };
        let (Ok(year), Ok(iso3)) = (row.date.parse::<i32>(), Iso3::new(&row.countryiso3code))
        else {
            tracing::warn!(date = %row.date, iso3 = %row.countryiso3code, "skipping malformed row");
            continue;
        };
        records.push(GdpRecord {
            year: Year(year),
            name: row.country.value,
            name_cn: name_cn.to_owned(),
            code: iso2.to_owned(),
            iso3,
            value: value / 1e9,
            color: color.to_owned(),
            flag: format!("{FLAG_BASE}/{iso2}.png"),
        });
    }
    tracing::debug!(kept = records.len(), skipped, "transformed world bank rows");

    records.sort_by(|a, b| a.year.cmp(&b.year).then_with(|| b.value.total_cmp(&a.value)));
    records
}

pub fn ensure_parent_dir(path: &Path) -> RaceResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create output directory '{}'", parent.display())
            })?;
        }
    }
    Ok(())
}

/// Writes the dataset as pretty JSON via a temp file and rename, so an
/// interrupted run never leaves a truncated dataset behind.
pub fn write_dataset(records: &[GdpRecord], path: &Path) -> RaceResult<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| RaceError::serde(format!("failed to serialize dataset: {e}")))?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &json)
        .with_context(|| format!("failed to write temp dataset '{}'", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to move dataset into '{}'", path.display()))?;
    Ok(())
}

/// Fetches the indicator in one request and writes the dataset. Returns the
/// record count.
#[tracing::instrument(skip(cfg))]
pub fn fetch_dataset(cfg: &FetchConfig) -> RaceResult<usize> {
    if cfg.end_year < cfg.start_year {
        return Err(RaceError::validation(format!(
            "year range {}:{} is inverted",
            cfg.start_year, cfg.end_year
        )));
    }

    let url = indicator_url(cfg);
    tracing::info!(%url, "fetching world bank data");
    let body = ureq::get(&url)
        .call()
        .map_err(|e| RaceError::fetch(format!("world bank request failed: {e}")))?
        .into_string()
        .map_err(|e| RaceError::fetch(format!("failed to read world bank response: {e}")))?;

    let (page, rows) = parse_envelope(&body)?;
    if page.pages > 1 {
        // per_page=20000 covers the full indicator today; warn if that stops
        // being true instead of silently truncating.
        tracing::warn!(
            page = page.page,
            pages = page.pages,
            "world bank response is paginated, fetched only the first page"
        );
    }

    let records = transform(rows);
    if records.is_empty() {
        return Err(RaceError::fetch("world bank returned no usable rows"));
    }

    write_dataset(&records, &cfg.out_path)?;
    tracing::info!(
        records = records.len(),
        api_total = page.total,
        out = %cfg.out_path.display(),
        "dataset written"
    );
    Ok(records.len())
}
