// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Static scanning of raw `.tf` sources.
//!
//! This is not a full HCL parser. It finds `resource "aws_*"` blocks, reads
//! their literal attributes and nested blocks, and collects variable defaults
//! and locals so references can be resolved afterwards. Everything it cannot
//! evaluate is kept as the raw expression text.

use super::resolve;
use crate::models::plan::ResourceChange;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Upper bound on `count` expansion per resource block.
const MAX_COUNT: u64 = 1000;

static RESOURCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bresource\s+"(aws_\w+)"\s+"(\w+)"\s*\{"#).expect("valid resource pattern")
});

static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bvariable\s+"([\w-]+)"\s*\{"#).expect("valid variable pattern")
});

static LOCALS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\blocals\s*\{").expect("valid locals pattern"));

/// Result of scanning a set of `.tf` files.
#[derive(Debug, Clone, Default)]
pub struct HclModule {
    /// One entry per resource instance, all planned as `create`
    pub resources: Vec<ResourceChange>,
    /// Variable defaults by name
    pub variables: Map<String, Value>,
    /// Local values by name
    pub locals: Map<String, Value>,
}

/// Scan `.tf` file contents (concatenated in order).
pub fn parse_hcl_files(files: &[String]) -> HclModule {
    let source = strip_comments(&files.join("\n"));
    let bytes = source.as_bytes();

    let mut variables = Map::new();
    for caps in VARIABLE_RE.captures_iter(&source) {
        let (Some(header), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = find_block_end(bytes, header.end());
        let attrs = parse_body(&source[header.end()..end]);
        if let Some(default) = attrs.get("default") {
            variables.insert(name.as_str().to_string(), default.clone());
        }
    }

    let mut locals = Map::new();
    for header in LOCALS_RE.find_iter(&source) {
        let end = find_block_end(bytes, header.end());
        locals.extend(parse_body(&source[header.end()..end]));
    }

    let mut resources = Vec::new();
    for caps in RESOURCE_RE.captures_iter(&source) {
        let (Some(header), Some(resource_type), Some(name)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let end = find_block_end(bytes, header.end());
        let attrs = parse_body(&source[header.end()..end]);

        match literal_count(attrs.get("count"), &variables, &locals) {
            Some(count) => {
                for i in 0..count as usize {
                    resources.push(ResourceChange::planned_create(
                        resource_type.as_str(),
                        name.as_str(),
                        Some(i),
                        Value::Object(attrs.clone()),
                    ));
                }
            }
            None => resources.push(ResourceChange::planned_create(
                resource_type.as_str(),
                name.as_str(),
                None,
                Value::Object(attrs),
            )),
        }
    }

    tracing::debug!(
        resources = resources.len(),
        variables = variables.len(),
        locals = locals.len(),
        "Scanned Terraform sources"
    );

    HclModule {
        resources,
        variables,
        locals,
    }
}

/// Evaluate `count` when it is a number or resolves to one.
fn literal_count(
    count: Option<&Value>,
    variables: &Map<String, Value>,
    locals: &Map<String, Value>,
) -> Option<u64> {
    let count = count?;
    let value = match count {
        Value::String(s) => resolve::lookup_reference(s, variables, locals)?.clone(),
        other => other.clone(),
    };
    let n = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    if n > MAX_COUNT {
        tracing::warn!(count = n, max = MAX_COUNT, "Clamping resource count");
    }
    Some(n.min(MAX_COUNT))
}

/// Drop `#`, `//` and `/* */` comments outside of string literals.
///
/// Quotes follow the same rules as `find_closing`: `"` and `'` both open a
/// literal that runs to the matching quote, with `\` escaping one character.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            '#' => skip_to_newline(&mut chars),
            '/' if chars.peek() == Some(&'/') => skip_to_newline(&mut chars),
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    // keep line structure
                    if c == '\n' {
                        out.push('\n');
                    }
                    prev = c;
                }
            }
            _ => out.push(c),
        }
    }

    out
}

fn skip_to_newline(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while let Some(&c) = chars.peek() {
        if c == '\n' {
            break;
        }
        chars.next();
    }
}

/// Index of the `}` closing a block whose body starts at `start`.
///
/// Braces inside quoted strings are ignored. An unterminated block runs to the
/// end of the input.
fn find_block_end(bytes: &[u8], start: usize) -> usize {
    find_closing(bytes, start, b'{', b'}')
}

fn find_closing(bytes: &[u8], start: usize, open: u8, close: u8) -> usize {
    let mut depth = 1usize;
    let mut quote: Option<u8> = None;
    let mut i = start;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 2;
                    continue;
                }
                if b == q {
                    quote = None;
                }
            }
            None => {
                if b == b'"' || b == b'\'' {
                    quote = Some(b);
                } else if b == open {
                    depth += 1;
                } else if b == close {
                    depth -= 1;
                    if depth == 0 {
                        return i;
                    }
                }
            }
        }
        i += 1;
    }

    bytes.len()
}

/// Parse the attributes and nested blocks of a block body.
fn parse_body(body: &str) -> Map<String, Value> {
    BodyParser::new(body).parse_attributes()
}

struct BodyParser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BodyParser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Skip whitespace, newlines, and separators between attributes.
    fn skip_separators(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || b == b',' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn skip_inline_space(&mut self) {
        while let Some(b) = self.peek() {
            if b == b' ' || b == b'\t' || b == b'\r' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(b) = self.peek() {
            self.pos += 1;
            if b == b'\n' {
                break;
            }
        }
    }

    fn parse_attributes(&mut self) -> Map<String, Value> {
        let mut attrs = Map::new();
        let mut nested: Vec<(String, Value)> = Vec::new();

        loop {
            self.skip_separators();
            if self.at_end() {
                break;
            }

            let Some(key) = self.read_key() else {
                self.skip_line();
                continue;
            };
            self.skip_inline_space();

            match self.peek() {
                Some(b'=') if self.bytes.get(self.pos + 1) != Some(&b'=') => {
                    self.pos += 1;
                    let value = self.parse_value();
                    attrs.insert(key, value);
                }
                Some(b':') => {
                    self.pos += 1;
                    let value = self.parse_value();
                    attrs.insert(key, value);
                }
                Some(b'{') | Some(b'"') => {
                    if let Some(block) = self.parse_nested_block() {
                        nested.push((key, Value::Object(block)));
                    } else {
                        self.skip_line();
                    }
                }
                _ => self.skip_line(),
            }
        }

        // Blocks never replace a same-named attribute.
        for (key, block) in nested {
            match attrs.get_mut(&key) {
                None => {
                    attrs.insert(key, Value::Array(vec![block]));
                }
                Some(Value::Array(items)) if items.iter().all(Value::is_object) => items.push(block),
                Some(_) => {}
            }
        }

        attrs
    }

    /// Identifier or quoted key.
    fn read_key(&mut self) -> Option<String> {
        match self.peek()? {
            b'"' => self.read_string(),
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let start = self.pos;
                while let Some(b) = self.peek() {
                    if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                Some(self.src[start..self.pos].to_string())
            }
            _ => None,
        }
    }

    /// A nested block, possibly with labels (`dynamic "ingress" { ... }`).
    fn parse_nested_block(&mut self) -> Option<Map<String, Value>> {
        loop {
            self.skip_inline_space();
            match self.peek()? {
                b'"' => {
                    self.read_string()?;
                }
                b'{' => break,
                _ => return None,
            }
        }
        self.pos += 1;
        let end = find_block_end(self.bytes, self.pos);
        let block = parse_body(&self.src[self.pos..end]);
        self.pos = (end + 1).min(self.bytes.len());
        Some(block)
    }

    fn parse_value(&mut self) -> Value {
        self.skip_inline_space();
        match self.peek() {
            Some(b'"') => match self.read_string() {
                Some(s) => Value::String(s),
                None => Value::Null,
            },
            Some(b'[') => {
                self.pos += 1;
                let end = find_closing(self.bytes, self.pos, b'[', b']');
                let list = parse_list(&self.src[self.pos..end]);
                self.pos = (end + 1).min(self.bytes.len());
                Value::Array(list)
            }
            Some(b'{') => {
                self.pos += 1;
                let end = find_block_end(self.bytes, self.pos);
                let map = parse_body(&self.src[self.pos..end]);
                self.pos = (end + 1).min(self.bytes.len());
                Value::Object(map)
            }
            Some(b'<') if self.src[self.pos..].starts_with("<<") => self.read_heredoc(),
            Some(_) => scalar_value(self.read_expression()),
            None => Value::Null,
        }
    }

    /// Read a `"..."` literal starting at the opening quote.
    fn read_string(&mut self) -> Option<String> {
        if self.peek() != Some(b'"') {
            return None;
        }
        let mut out = String::new();
        let mut chars = self.src[self.pos + 1..].char_indices();
        while let Some((offset, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += 1 + offset + 1;
                    return Some(out);
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, '"')) => out.push('"'),
                    Some((_, '\\')) => out.push('\\'),
                    Some((_, other)) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => break,
                },
                _ => out.push(c),
            }
        }
        // Unterminated literal: take the rest.
        self.pos = self.bytes.len();
        Some(out)
    }

    /// Bare expression up to the end of line (or a separator) at nesting depth 0.
    fn read_expression(&mut self) -> &'a str {
        let start = self.pos;
        let mut depth = 0i32;
        let mut quote: Option<u8> = None;

        while let Some(b) = self.peek() {
            if let Some(q) = quote {
                if b == b'\\' {
                    self.pos += 2;
                    continue;
                }
                if b == q {
                    quote = None;
                }
            } else {
                match b {
                    b'"' | b'\'' => quote = Some(b),
                    b'(' | b'[' | b'{' => depth += 1,
                    b')' | b']' | b'}' => depth -= 1,
                    b'\n' | b',' if depth <= 0 => break,
                    _ => {}
                }
            }
            self.pos += 1;
        }

        let end = self.pos.min(self.bytes.len());
        self.src[start..end].trim()
    }

    /// `<<EOF` / `<<-EOF` heredoc; the value is the enclosed text.
    fn read_heredoc(&mut self) -> Value {
        let header_start = self.pos + 2;
        let rest = &self.src[header_start..];
        let line_end = rest.find('\n').unwrap_or(rest.len());
        let marker = rest[..line_end].trim().trim_start_matches('-').trim();
        let indented = rest.starts_with('-');

        let mut lines = Vec::new();
        let mut consumed = line_end + 1;
        let mut terminated = false;
        for line in rest.get(line_end + 1..).unwrap_or("").split('\n') {
            consumed += line.len() + 1;
            if line.trim() == marker {
                terminated = true;
                break;
            }
            lines.push(if indented { line.trim_start() } else { line });
        }

        self.pos = if terminated {
            (header_start + consumed).min(self.bytes.len())
        } else {
            self.bytes.len()
        };
        Value::String(lines.join("\n"))
    }
}

/// Elements of a `[ ... ]` list body.
fn parse_list(body: &str) -> Vec<Value> {
    let mut parser = BodyParser::new(body);
    let mut items = Vec::new();
    loop {
        parser.skip_separators();
        if parser.at_end() {
            break;
        }
        let before = parser.pos;
        items.push(parser.parse_value());
        if parser.pos == before {
            // not a value we understand
            parser.pos += 1;
        }
    }
    items
}

/// Literal scalar or, failing that, the raw expression text.
fn scalar_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => {
            if let Ok(i) = raw.parse::<i64>() {
                return Value::from(i);
            }
            raw.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(raw.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scan(src: &str) -> HclModule {
        parse_hcl_files(&[src.to_string()])
    }

    #[test]
    fn test_basic_resource_attributes() {
        let module = scan(
            r#"
resource "aws_instance" "web" {
  ami           = "ami-123456"
  instance_type = "t3.large" # inline comment
  monitoring    = true
  ebs_optimized = false
  cpu_credits   = 2.5
  subnet_id     = aws_subnet.main.id
  security_groups = ["sg-1", "sg-2"]

  root_block_device {
    volume_size = 50
    volume_type = "gp3"
  }

  tags = {
    Name = "web-server"
  }
}
"#,
        );

        assert_eq!(module.resources.len(), 1);
        let web = &module.resources[0];
        assert_eq!(web.address, "aws_instance.web");
        assert_eq!(web.change.before, Value::Null);
        assert_eq!(web.attr_str("instance_type"), Some("t3.large"));
        assert_eq!(web.attr("monitoring"), Some(&json!(true)));
        assert_eq!(web.attr("ebs_optimized"), Some(&json!(false)));
        assert_eq!(web.attr_f64("cpu_credits"), Some(2.5));
        assert_eq!(web.attr_str("subnet_id"), Some("aws_subnet.main.id"));
        assert_eq!(web.attr("security_groups"), Some(&json!(["sg-1", "sg-2"])));
        assert_eq!(
            web.attr("root_block_device"),
            Some(&json!([{"volume_size": 50, "volume_type": "gp3"}]))
        );
        assert_eq!(web.attr("tags"), Some(&json!({"Name": "web-server"})));
    }

    #[test]
    fn test_nested_attributes_do_not_shadow_top_level() {
        let module = scan(
            r#"
resource "aws_launch_template" "lt" {
  instance_type = "m5.large"
  block_device_mappings {
    device_name = "/dev/sda1"
    ebs {
      volume_size = 100
    }
  }
}
"#,
        );
        let lt = &module.resources[0];
        assert_eq!(lt.attr_str("instance_type"), Some("m5.large"));
        assert!(lt.attr("volume_size").is_none());
        let mapping = lt.block("block_device_mappings").unwrap();
        assert_eq!(mapping["ebs"], json!([{"volume_size": 100}]));
    }

    #[test]
    fn test_braces_inside_strings_and_escaped_quotes() {
        let module = scan(
            r#"
resource "aws_iam_policy" "p" {
  description = "uses { braces } and \"quotes\""
  policy = "{\"Version\": \"2012-10-17\"}"
}
resource "aws_eip" "ip" {
  domain = "vpc"
}
"#,
        );
        assert_eq!(module.resources.len(), 2);
        assert_eq!(
            module.resources[0].attr_str("description"),
            Some(r#"uses { braces } and "quotes""#)
        );
        assert_eq!(module.resources[1].attr_str("domain"), Some("vpc"));
    }

    #[test]
    fn test_comments_are_ignored() {
        let module = scan(
            r#"
# resource "aws_instance" "commented" {
// resource "aws_instance" "also_commented" {
/*
resource "aws_instance" "block_commented" {}
*/
resource "aws_instance" "real" {
  instance_type = "t3.nano" // trailing
  user_data     = "echo #not-a-comment"
}
"#,
        );
        assert_eq!(module.resources.len(), 1);
        let real = &module.resources[0];
        assert_eq!(real.attr_str("instance_type"), Some("t3.nano"));
        assert_eq!(real.attr_str("user_data"), Some("echo #not-a-comment"));
    }

    #[test]
    fn test_single_quoted_hash_is_not_a_comment() {
        assert_eq!(
            strip_comments("tag = 'a # b' # gone\nx = 1"),
            "tag = 'a # b' \nx = 1"
        );
        assert_eq!(strip_comments(r"s = 'it\'s // here'"), r"s = 'it\'s // here'");

        let module = scan(
            r#"
resource "aws_instance" "first" {
  instance_type = "t3.micro"
  description   = 'temp # {'
}
resource "aws_instance" "second" {
  instance_type = "t3.small"
}
"#,
        );
        assert_eq!(module.resources.len(), 2);
        assert_eq!(module.resources[0].attr_str("description"), Some("'temp # {'"));
        assert_eq!(module.resources[1].attr_str("instance_type"), Some("t3.small"));
    }

    #[test]
    fn test_count_expansion() {
        let module = scan(
            r#"
variable "replicas" {
  type    = number
  default = 2
}
resource "aws_instance" "app" {
  count         = 3
  instance_type = "t3.small"
}
resource "aws_instance" "none" {
  count = 0
}
resource "aws_instance" "from_var" {
  count = var.replicas
}
"#,
        );
        let addresses: Vec<&str> = module.resources.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec![
                "aws_instance.app[0]",
                "aws_instance.app[1]",
                "aws_instance.app[2]",
                "aws_instance.from_var[0]",
                "aws_instance.from_var[1]",
            ]
        );
    }

    #[test]
    fn test_variables_and_locals_collected() {
        let module = scan(
            r#"
variable "instance_type" {
  description = "EC2 type"
  default     = "t3.medium"
}
variable "no_default" {
  type = string
}
locals {
  env  = "prod"
  size = 40
}
"#,
        );
        assert_eq!(module.variables.get("instance_type"), Some(&json!("t3.medium")));
        assert!(!module.variables.contains_key("no_default"));
        assert_eq!(module.locals.get("env"), Some(&json!("prod")));
        assert_eq!(module.locals.get("size"), Some(&json!(40)));
    }

    #[test]
    fn test_unterminated_block_runs_to_end() {
        let module = scan("resource \"aws_eip\" \"x\" {\n  domain = \"vpc\"\n");
        assert_eq!(module.resources.len(), 1);
        assert_eq!(module.resources[0].attr_str("domain"), Some("vpc"));
    }

    #[test]
    fn test_non_aws_resources_skipped() {
        let module = scan(
            r#"
resource "random_id" "suffix" {
  byte_length = 4
}
resource "aws_kms_key" "k" {}
"#,
        );
        assert_eq!(module.resources.len(), 1);
        assert_eq!(module.resources[0].resource_type, "aws_kms_key");
    }

    #[test]
    fn test_heredoc_and_multiline_expression() {
        let module = scan(
            r#"
resource "aws_instance" "h" {
  user_data = <<-EOT
    echo hi
    echo there
  EOT
  instance_type = lookup(
    var.types,
    "web"
  )
  ami = "ami-1"
}
"#,
        );
        let h = &module.resources[0];
        assert_eq!(h.attr_str("user_data"), Some("echo hi\necho there"));
        assert_eq!(h.attr_str("ami"), Some("ami-1"));
        assert!(h.attr_str("instance_type").unwrap().starts_with("lookup("));
    }
}
