//! 报告分行与分类
//!
//! 把一次扫描的完整输出切成行，并把每一行归为三类之一：
//! `key: value` 结构行、判毒标记行、其他。空行直接丢弃。
//! 迭代器只借用原始字符串，`clone()` 即可从头再来一遍。

/// 分类后的单行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifiedLine<'a> {
    /// 含冒号的行；只以第一个冒号为分隔，其余冒号归入 value
    KeyValue { key: &'a str, value: &'a str },
    /// 含判毒标记的整行
    VerdictMarker(&'a str),
    Unclassified(&'a str),
}

impl<'a> ClassifiedLine<'a> {
    /// 结构化的 key/value 视图
    ///
    /// 标记行若本身含冒号（如 `/tmp/x: <Eicar> [Found virus]`），同样可取到 key/value，
    /// 因此也计入“结构行”。
    pub fn key_value(&self) -> Option<(&'a str, &'a str)> {
        match *self {
            ClassifiedLine::KeyValue { key, value } => Some((key, value)),
            ClassifiedLine::VerdictMarker(line) => line.split_once(':'),
            ClassifiedLine::Unclassified(_) => None,
        }
    }
}

/// 分类行迭代器
#[derive(Debug, Clone)]
pub struct ClassifiedLines<'a> {
    lines: std::str::Split<'a, char>,
    marker: &'a str,
}

/// 对原始输出分行分类；`marker` 为空时不识别任何标记行
pub fn tokenize<'a>(raw: &'a str, marker: &'a str) -> ClassifiedLines<'a> {
    ClassifiedLines { lines: raw.split('\n'), marker }
}

impl<'a> ClassifiedLines<'a> {
    fn classify(&self, line: &'a str) -> ClassifiedLine<'a> {
        if !self.marker.is_empty() && line.contains(self.marker) {
            return ClassifiedLine::VerdictMarker(line);
        }
        match line.split_once(':') {
            Some((key, value)) => ClassifiedLine::KeyValue { key, value },
            None => ClassifiedLine::Unclassified(line),
        }
    }
}

impl<'a> Iterator for ClassifiedLines<'a> {
    type Item = ClassifiedLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() {
                continue;
            }
            return Some(self.classify(line));
        }
    }
}
