//! English-content and domain filters for web results.
//!
//! [`is_english`] rejects text dominated by CJK, Hangul, kana, or Cyrillic
//! characters. [`is_blocked_url`] and [`is_trusted_site`] classify result
//! URLs against fixed domain lists by case-insensitive substring match.

use game_lore_core::models::SearchResult;

/// Known English gaming wikis and outlets, preferred over other results.
pub const TRUSTED_DOMAINS: &[&str] = &[
    "fandom.com",
    "fextralife.com",
    "ign.com",
    "gamespot.com",
    "gamefaqs.gamespot.com",
    "polygon.com",
    "eurogamer.net",
    "pcgamer.com",
    "rockpapershotgun.com",
    "gamesradar.com",
];

/// Domains never used as a source, whatever their content.
pub const BLOCKED_DOMAINS: &[&str] = &[
    "baidu.com",
    "zhihu.com",
    "bilibili.com",
    "tieba.baidu.com",
    "jingyan.baidu.com",
    "weibo.com",
    "163.com",
    "qq.com",
    "tianya.cn",
    "sohu.com",
    "sina.com",
    "douban.com",
    "csdn.net",
    "jianshu.com",
    "toutiao.com",
    "youku.com",
    "iqiyi.com",
    "acfun.cn",
    "huya.com",
    "douyu.com",
    "taobao.com",
    "tmall.com",
    "jd.com",
    "xiaohongshu.com",
    "meituan.com",
    "dianping.com",
];

/// Largest tolerated share of non-Latin characters.
const MAX_FOREIGN_RATIO: f64 = 0.1;

fn is_foreign_char(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'   // CJK unified ideographs
        | '\u{3040}'..='\u{309F}' // hiragana
        | '\u{30A0}'..='\u{30FF}' // katakana
        | '\u{AC00}'..='\u{D7AF}' // hangul syllables
        | '\u{0400}'..='\u{04FF}' // cyrillic
    )
}

/// True when `text` is non-empty and at most 10% of its characters are
/// CJK, kana, Hangul, or Cyrillic.
pub fn is_english(text: &str) -> bool {
    let mut total = 0usize;
    let mut foreign = 0usize;
    for c in text.chars() {
        total += 1;
        if is_foreign_char(c) {
            foreign += 1;
        }
    }
    if total == 0 {
        return false;
    }
    (foreign as f64 / total as f64) <= MAX_FOREIGN_RATIO
}

pub fn is_blocked_url(url: &str) -> bool {
    let url = url.to_lowercase();
    BLOCKED_DOMAINS.iter().any(|d| url.contains(d))
}

/// Not blocked and hosted on a [`TRUSTED_DOMAINS`] site.
pub fn is_trusted_site(url: &str) -> bool {
    if is_blocked_url(url) {
        return false;
    }
    let url = url.to_lowercase();
    TRUSTED_DOMAINS.iter().any(|d| url.contains(d))
}

/// Keep results that are not blocked and whose title and snippet read as English.
pub fn filter_english(results: Vec<SearchResult>) -> Vec<SearchResult> {
    results
        .into_iter()
        .filter(|r| !is_blocked_url(&r.href) && is_english(&r.title) && is_english(&r.body))
        .collect()
}
