//! Built-in message catalog
//!
//! Every recommendation carries its text in all supported locales; the
//! renderer picks one. Adding a locale means adding one more arm per message
//! here, nothing else.

use crate::recommendation::{LocalizedText, MessageBundle};

/// Locales the built-in catalog provides
pub const SUPPORTED_LOCALES: &[&str] = &["en", "zh"];

fn text(en: impl Into<String>, zh: impl Into<String>) -> LocalizedText {
    LocalizedText::new().with("en", en).with("zh", zh)
}

fn table_or_unknown(table: Option<&str>) -> (String, String) {
    match table {
        Some(table) => (format!("'{table}'"), format!("表 {table}")),
        None => ("an unnamed relation".to_string(), "未命名的关系".to_string()),
    }
}

pub(crate) fn seq_scan_with_filter(
    table: Option<&str>,
    rows: u64,
    filter: &str,
    columns: &[String],
) -> MessageBundle {
    let (en_table, zh_table) = table_or_unknown(table);
    let suggestion = if columns.is_empty() {
        text(
            "Create an index on the columns used in the filter condition.",
            "为过滤条件中使用的列创建索引。",
        )
    } else {
        let cols = columns.join(", ");
        text(
            format!("Create an index on ({cols}) so the filter can use an index scan."),
            format!("在 ({cols}) 上创建索引，使过滤条件可以走索引扫描。"),
        )
    };

    MessageBundle {
        title: text("Sequential scan with filter", "带过滤条件的全表扫描"),
        issue: text(
            format!("Seq Scan on {en_table} reads {rows} rows and applies filter {filter}."),
            format!("对{zh_table}的顺序扫描读取了 {rows} 行，并应用过滤条件 {filter}。"),
        ),
        explanation: text(
            "Without a usable index every row is read and tested against the filter, so cost grows with table size.",
            "没有可用索引时，每一行都要被读取并与过滤条件比较，开销随表大小线性增长。",
        ),
        suggestion,
    }
}

pub(crate) fn estimation_error(
    table: Option<&str>,
    planned: u64,
    actual: u64,
    ratio: f64,
) -> MessageBundle {
    let (en_table, zh_table) = table_or_unknown(table);
    let direction_en = if ratio > 1.0 { "underestimated" } else { "overestimated" };
    let direction_zh = if ratio > 1.0 { "低估" } else { "高估" };

    MessageBundle {
        title: text("Row estimate is far off", "行数估算严重偏差"),
        issue: text(
            format!(
                "The planner {direction_en} rows for {en_table}: expected {planned}, got {actual} ({ratio:.2}x)."
            ),
            format!(
                "优化器{direction_zh}了{zh_table}的行数：预计 {planned} 行，实际 {actual} 行（{ratio:.2} 倍）。"
            ),
        ),
        explanation: text(
            "Bad estimates lead the planner to pick the wrong join strategy or scan type. Stale statistics are the usual cause.",
            "错误的估算会导致优化器选择错误的连接方式或扫描方式，通常是统计信息过期造成的。",
        ),
        suggestion: text(
            "Refresh the table statistics with ANALYZE.",
            "使用 ANALYZE 刷新表的统计信息。",
        ),
    }
}

pub(crate) fn nested_loop_inner_seq_scan(loops: u64, inner: Option<&str>) -> MessageBundle {
    let (en_table, zh_table) = table_or_unknown(inner);

    MessageBundle {
        title: text("Nested loop over a sequential scan", "嵌套循环内层为全表扫描"),
        issue: text(
            format!("Nested Loop runs {loops} times and scans {en_table} sequentially on every iteration."),
            format!("嵌套循环执行了 {loops} 次，每次都对{zh_table}进行顺序扫描。"),
        ),
        explanation: text(
            "The inner side of a nested loop is re-executed for each outer row; a full scan there multiplies its cost by the loop count.",
            "嵌套循环的内层会针对每一行外层数据重新执行，内层全表扫描的开销会乘以循环次数。",
        ),
        suggestion: text(
            format!("Add an index on the join key of {en_table}."),
            format!("为{zh_table}的连接键创建索引。"),
        ),
    }
}

pub(crate) fn disk_sort(
    space_used_kb: Option<u64>,
    method: Option<&str>,
    work_mem: &str,
) -> MessageBundle {
    let (spill_en, spill_zh) = match space_used_kb {
        Some(kb) => (format!(" and wrote {kb} kB to disk"), format!("，写入磁盘 {kb} kB")),
        None => (String::new(), String::new()),
    };
    let method = method.unwrap_or("external sort");

    MessageBundle {
        title: text("Sort spilled to disk", "排序溢出到磁盘"),
        issue: text(
            format!("Sort used method '{method}'{spill_en}."),
            format!("排序使用了 '{method}' 方法{spill_zh}。"),
        ),
        explanation: text(
            "The sort did not fit in work_mem, so it fell back to temporary files, which is much slower than sorting in memory.",
            "排序数据超出了 work_mem，只能使用临时文件，比内存排序慢得多。",
        ),
        suggestion: text(
            format!("Raise work_mem for this query (for example to {work_mem}) or add an index that returns rows already in order."),
            format!("为该查询调大 work_mem（例如 {work_mem}），或添加能按顺序返回数据的索引。"),
        ),
    }
}
