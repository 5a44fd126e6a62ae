use super::{AssembledSchema, SchemaFile};
use crate::error::{Error, Result};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileOptions,
    ServiceDescriptorProto, UninterpretedOption,
};
use std::collections::{HashMap, HashSet};

const MAX_FIELD_NUMBER: i32 = 536_870_911;

const LABEL_OPTIONAL: i32 = 1;
const LABEL_REQUIRED: i32 = 2;
const LABEL_REPEATED: i32 = 3;

const TYPE_GROUP: i32 = 10;
const TYPE_MESSAGE: i32 = 11;
const TYPE_BYTES: i32 = 12;
const TYPE_ENUM: i32 = 14;
const TYPE_STRING: i32 = 9;

/// Render one assembled unit, dependencies first.
///
/// Output is all-or-nothing: the first construct that cannot be printed
/// faithfully fails the whole call.
pub fn render(schema: &AssembledSchema<'_>) -> Result<String> {
    render_files(schema.files.iter().copied())
}

/// Render several units, printing each file once at its first position.
pub fn render_all(schemas: &[AssembledSchema<'_>]) -> Result<String> {
    let mut seen = HashSet::new();
    render_files(
        schemas
            .iter()
            .flat_map(|s| s.files.iter().copied())
            .filter(|f| seen.insert(f.name())),
    )
}

fn render_files<'a>(files: impl IntoIterator<Item = &'a SchemaFile>) -> Result<String> {
    let files: Vec<&SchemaFile> = files.into_iter().collect();
    let symbols = Symbols::collect(&files);
    let mut out = String::new();
    for file in files {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&Printer::new(file, &symbols).print()?);
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolKind {
    Package,
    Message,
    Enum,
    Service,
}

/// Fully-qualified names visible to the files being printed
struct Symbols {
    kinds: HashMap<String, SymbolKind>,
}

impl Symbols {
    fn collect(files: &[&SchemaFile]) -> Self {
        let mut kinds = HashMap::new();
        for file in files {
            let package = file.proto.package();
            let mut prefix = String::new();
            for part in package.split('.').filter(|p| !p.is_empty()) {
                prefix = qualify(&prefix, part);
                kinds.entry(prefix.clone()).or_insert(SymbolKind::Package);
            }
            for message in &file.proto.message_type {
                collect_message(&mut kinds, package, message);
            }
            for enumeration in &file.proto.enum_type {
                kinds.insert(qualify(package, enumeration.name()), SymbolKind::Enum);
            }
            for service in &file.proto.service {
                kinds.insert(qualify(package, service.name()), SymbolKind::Service);
            }
        }
        Symbols { kinds }
    }

    /// What protoc binds a relative type name to when it appears in `scope`.
    ///
    /// The first component is searched from the innermost scope outward. A
    /// compound name stops at the first aggregate, a simple name at the first type.
    fn resolve(&self, scope: &str, relative: &str) -> Option<String> {
        let (first, compound) = match relative.split_once('.') {
            Some((first, _)) => (first, true),
            None => (relative, false),
        };
        let mut scope = Some(scope);
        while let Some(current) = scope {
            let kind = self.kinds.get(&qualify(current, first));
            let bound = match kind {
                Some(_) if compound => true,
                Some(SymbolKind::Message | SymbolKind::Enum) => true,
                _ => false,
            };
            if bound {
                return Some(qualify(current, relative));
            }
            scope = match current {
                "" => None,
                _ => Some(current.rsplit_once('.').map_or("", |(parent, _)| parent)),
            };
        }
        None
    }
}

fn collect_message(
    kinds: &mut HashMap<String, SymbolKind>,
    scope: &str,
    message: &DescriptorProto,
) {
    let full_name = qualify(scope, message.name());
    for nested in &message.nested_type {
        collect_message(kinds, &full_name, nested);
    }
    for enumeration in &message.enum_type {
        kinds.insert(qualify(&full_name, enumeration.name()), SymbolKind::Enum);
    }
    kinds.insert(full_name, SymbolKind::Message);
}

struct Printer<'a> {
    file: &'a SchemaFile,
    symbols: &'a Symbols,
    proto3: bool,
    depth: usize,
    /// Fully-qualified scope type references are resolved from
    scope: String,
    out: String,
}

impl<'a> Printer<'a> {
    fn new(file: &'a SchemaFile, symbols: &'a Symbols) -> Self {
        Printer {
            file,
            symbols,
            proto3: false,
            depth: 0,
            scope: file.proto.package().to_string(),
            out: String::new(),
        }
    }

    fn fail(&self, construct: impl Into<String>) -> Error {
        Error::unrenderable(self.file.name(), construct)
    }

    fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str("  ");
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    fn print(mut self) -> Result<String> {
        let file = self.file;
        let proto = &file.proto;

        if file.unretained_bytes > 0 {
            return Err(self.fail(format!(
                "{} bytes of extensions or custom options outside descriptor.proto",
                file.unretained_bytes
            )));
        }
        self.proto3 = match proto.syntax() {
            "" | "proto2" => false,
            "proto3" => true,
            other => return Err(self.fail(format!("syntax \"{other}\""))),
        };

        self.line(&format!("// {}", proto.name()));
        let syntax = if self.proto3 { "proto3" } else { "proto2" };
        self.line(&format!("syntax = \"{syntax}\";"));

        if !proto.package().is_empty() {
            self.line("");
            self.line(&format!("package {};", proto.package()));
        }

        if !proto.dependency.is_empty() {
            self.line("");
            for (i, dep) in proto.dependency.iter().enumerate() {
                let i = i as i32;
                let modifier = if proto.public_dependency.contains(&i) {
                    "public "
                } else if proto.weak_dependency.contains(&i) {
                    "weak "
                } else {
                    ""
                };
                self.line(&format!("import {modifier}{};", quote(dep)));
            }
        }

        if let Some(options) = &proto.options {
            let options = self.file_options(options)?;
            if !options.is_empty() {
                self.line("");
                for option in options {
                    self.line(&format!("option {option};"));
                }
            }
        }

        for message in &proto.message_type {
            self.line("");
            self.message(message)?;
        }
        for enumeration in &proto.enum_type {
            self.line("");
            self.enumeration(enumeration)?;
        }
        for service in &proto.service {
            self.line("");
            self.service(service)?;
        }
        if !proto.extension.is_empty() {
            self.line("");
            self.extensions(&proto.extension)?;
        }

        Ok(self.out)
    }

    fn file_options(&self, o: &FileOptions) -> Result<Vec<String>> {
        self.check_uninterpreted(&o.uninterpreted_option, "file option")?;
        let mut opts = Vec::new();
        if let Some(v) = &o.java_package {
            opts.push(format!("java_package = {}", quote(v)));
        }
        if let Some(v) = &o.java_outer_classname {
            opts.push(format!("java_outer_classname = {}", quote(v)));
        }
        if let Some(mode) = o.optimize_for {
            let mode = match mode {
                1 => "SPEED",
                2 => "CODE_SIZE",
                3 => "LITE_RUNTIME",
                other => return Err(self.fail(format!("optimize_for value {other}"))),
            };
            opts.push(format!("optimize_for = {mode}"));
        }
        if let Some(v) = o.java_multiple_files {
            opts.push(format!("java_multiple_files = {v}"));
        }
        if let Some(v) = &o.go_package {
            opts.push(format!("go_package = {}", quote(v)));
        }
        if let Some(v) = o.deprecated {
            opts.push(format!("deprecated = {v}"));
        }
        if let Some(v) = o.cc_enable_arenas {
            opts.push(format!("cc_enable_arenas = {v}"));
        }
        for (name, value) in [
            ("objc_class_prefix", &o.objc_class_prefix),
            ("csharp_namespace", &o.csharp_namespace),
            ("swift_prefix", &o.swift_prefix),
            ("php_namespace", &o.php_namespace),
            ("ruby_package", &o.ruby_package),
        ] {
            if let Some(v) = value {
                opts.push(format!("{name} = {}", quote(v)));
            }
        }
        Ok(opts)
    }

    fn message(&mut self, message: &DescriptorProto) -> Result<()> {
        let full_name = qualify(&self.scope, message.name());
        let outer = std::mem::replace(&mut self.scope, full_name.clone());
        self.line(&format!("message {} {{", message.name()));
        self.depth += 1;

        if let Some(o) = &message.options {
            self.check_uninterpreted(&o.uninterpreted_option, "message option")?;
            if let Some(v) = o.message_set_wire_format {
                self.line(&format!("option message_set_wire_format = {v};"));
            }
            if let Some(v) = o.no_standard_descriptor_accessor {
                self.line(&format!("option no_standard_descriptor_accessor = {v};"));
            }
            if let Some(v) = o.deprecated {
                self.line(&format!("option deprecated = {v};"));
            }
        }

        let mut printed_oneofs = HashSet::new();
        for field in &message.field {
            let Some(index) = field.oneof_index.filter(|_| !field.proto3_optional()) else {
                let text = self.field(field, false, Some((message, full_name.as_str())))?;
                self.line(&text);
                continue;
            };
            if !printed_oneofs.insert(index) {
                continue;
            }
            let decl = message.oneof_decl.get(index as usize).ok_or_else(|| {
                self.fail(format!("field {} refers to missing oneof {index}", field.name()))
            })?;
            if let Some(o) = &decl.options {
                self.check_uninterpreted(&o.uninterpreted_option, "oneof option")?;
            }
            self.line(&format!("oneof {} {{", decl.name()));
            self.depth += 1;
            for member in message
                .field
                .iter()
                .filter(|f| f.oneof_index == Some(index) && !f.proto3_optional())
            {
                let text = self.field(member, true, None)?;
                self.line(&text);
            }
            self.depth -= 1;
            self.line("}");
        }

        for enumeration in &message.enum_type {
            self.enumeration(enumeration)?;
        }
        for nested in &message.nested_type {
            if is_map_entry(nested) {
                continue;
            }
            self.message(nested)?;
        }
        self.extensions(&message.extension)?;

        let mut extension_ranges = Vec::new();
        for range in &message.extension_range {
            if let Some(o) = &range.options {
                self.check_uninterpreted(&o.uninterpreted_option, "extension range option")?;
            }
            let last = range.end().checked_sub(1);
            let text = self.number_range("extension", range.start(), last, MAX_FIELD_NUMBER)?;
            extension_ranges.push(text);
        }
        if !extension_ranges.is_empty() {
            self.line(&format!("extensions {};", extension_ranges.join(", ")));
        }

        let reserved = message
            .reserved_range
            .iter()
            .map(|r| {
                let last = r.end().checked_sub(1);
                self.number_range("reserved", r.start(), last, MAX_FIELD_NUMBER)
            })
            .collect::<Result<Vec<_>>>()?;
        self.reserved(&reserved, &message.reserved_name);

        self.depth -= 1;
        self.line("}");
        self.scope = outer;
        Ok(())
    }

    fn field(
        &self,
        field: &FieldDescriptorProto,
        in_oneof: bool,
        parent: Option<(&DescriptorProto, &str)>,
    ) -> Result<String> {
        let map = parent.and_then(|(message, full_name)| map_entry(field, message, full_name));
        let (label, ty) = match map {
            Some(entry) => {
                let key = entry_field(entry, 1).ok_or_else(|| self.fail("map entry without key"))?;
                let value =
                    entry_field(entry, 2).ok_or_else(|| self.fail("map entry without value"))?;
                let ty = format!("map<{}, {}>", self.field_type(key)?, self.field_type(value)?);
                ("", ty)
            }
            None => (self.label(field, in_oneof)?, self.field_type(field)?),
        };

        let mut text = format!("{label}{ty} {} = {}", field.name(), field.number());
        let options = self.field_options(field)?;
        if !options.is_empty() {
            text.push_str(&format!(" [{}]", options.join(", ")));
        }
        text.push(';');
        Ok(text)
    }

    fn label(&self, field: &FieldDescriptorProto, in_oneof: bool) -> Result<&'static str> {
        if in_oneof {
            return Ok("");
        }
        let implicit = if self.proto3 { "" } else { "optional " };
        match field.label {
            None => Ok(implicit),
            Some(LABEL_OPTIONAL) if field.proto3_optional() => Ok("optional "),
            Some(LABEL_OPTIONAL) => Ok(implicit),
            Some(LABEL_REQUIRED) => Ok("required "),
            Some(LABEL_REPEATED) => Ok("repeated "),
            Some(other) => Err(self.fail(format!("label {other} on field {}", field.name()))),
        }
    }

    fn field_type(&self, field: &FieldDescriptorProto) -> Result<String> {
        let Some(raw) = field.r#type else {
            return match field.type_name.as_deref() {
                Some(name) if !name.is_empty() => Ok(self.type_ref(name)),
                _ => Err(self.fail(format!("field {} has no type", field.name()))),
            };
        };
        let scalar = match raw {
            1 => "double",
            2 => "float",
            3 => "int64",
            4 => "uint64",
            5 => "int32",
            6 => "fixed64",
            7 => "fixed32",
            8 => "bool",
            TYPE_STRING => "string",
            TYPE_BYTES => "bytes",
            13 => "uint32",
            15 => "sfixed32",
            16 => "sfixed64",
            17 => "sint32",
            18 => "sint64",
            TYPE_MESSAGE | TYPE_ENUM => {
                return match field.type_name.as_deref() {
                    Some(name) if !name.is_empty() => Ok(self.type_ref(name)),
                    _ => Err(self.fail(format!("field {} has no type name", field.name()))),
                };
            }
            TYPE_GROUP => return Err(self.fail(format!("group field {}", field.name()))),
            other => return Err(self.fail(format!("field type {other} on {}", field.name()))),
        };
        Ok(scalar.to_string())
    }

    fn field_options(&self, field: &FieldDescriptorProto) -> Result<Vec<String>> {
        let mut opts = Vec::new();
        if let Some(default) = &field.default_value {
            let literal = match field.r#type {
                Some(TYPE_STRING) => quote(default),
                // already C-escaped by the compiler
                Some(TYPE_BYTES) => format!("\"{default}\""),
                _ => default.clone(),
            };
            opts.push(format!("default = {literal}"));
        }
        if let Some(json_name) = &field.json_name {
            if *json_name != default_json_name(field.name()) {
                opts.push(format!("json_name = {}", quote(json_name)));
            }
        }

        let Some(o) = &field.options else {
            return Ok(opts);
        };
        self.check_uninterpreted(&o.uninterpreted_option, "field option")?;
        if let Some(ctype) = o.ctype {
            let ctype = match ctype {
                0 => "STRING",
                1 => "CORD",
                2 => "STRING_PIECE",
                other => return Err(self.fail(format!("ctype value {other}"))),
            };
            opts.push(format!("ctype = {ctype}"));
        }
        if let Some(v) = o.packed {
            opts.push(format!("packed = {v}"));
        }
        if let Some(jstype) = o.jstype {
            let jstype = match jstype {
                0 => "JS_NORMAL",
                1 => "JS_STRING",
                2 => "JS_NUMBER",
                other => return Err(self.fail(format!("jstype value {other}"))),
            };
            opts.push(format!("jstype = {jstype}"));
        }
        if let Some(v) = o.lazy {
            opts.push(format!("lazy = {v}"));
        }
        if let Some(v) = o.deprecated {
            opts.push(format!("deprecated = {v}"));
        }
        if let Some(v) = o.weak {
            opts.push(format!("weak = {v}"));
        }
        Ok(opts)
    }

    fn extensions(&mut self, fields: &[FieldDescriptorProto]) -> Result<()> {
        let mut start = 0;
        while start < fields.len() {
            let extendee = fields[start].extendee();
            let end = fields[start..]
                .iter()
                .position(|f| f.extendee() != extendee)
                .map_or(fields.len(), |n| start + n);

            let target = self.type_ref(extendee);
            self.line(&format!("extend {target} {{"));
            self.depth += 1;
            for field in &fields[start..end] {
                let text = self.field(field, false, None)?;
                self.line(&text);
            }
            self.depth -= 1;
            self.line("}");
            start = end;
        }
        Ok(())
    }

    fn enumeration(&mut self, enumeration: &EnumDescriptorProto) -> Result<()> {
        self.line(&format!("enum {} {{", enumeration.name()));
        self.depth += 1;

        if let Some(o) = &enumeration.options {
            self.check_uninterpreted(&o.uninterpreted_option, "enum option")?;
            if let Some(v) = o.allow_alias {
                self.line(&format!("option allow_alias = {v};"));
            }
            if let Some(v) = o.deprecated {
                self.line(&format!("option deprecated = {v};"));
            }
        }

        for value in &enumeration.value {
            let mut text = format!("{} = {}", value.name(), value.number());
            if let Some(o) = &value.options {
                self.check_uninterpreted(&o.uninterpreted_option, "enum value option")?;
                if let Some(v) = o.deprecated {
                    text.push_str(&format!(" [deprecated = {v}]"));
                }
            }
            text.push(';');
            self.line(&text);
        }

        // enum reserved ends are inclusive
        let reserved = enumeration
            .reserved_range
            .iter()
            .map(|r| self.number_range("enum reserved", r.start(), Some(r.end()), i32::MAX))
            .collect::<Result<Vec<_>>>()?;
        self.reserved(&reserved, &enumeration.reserved_name);

        self.depth -= 1;
        self.line("}");
        Ok(())
    }

    fn service(&mut self, service: &ServiceDescriptorProto) -> Result<()> {
        self.line(&format!("service {} {{", service.name()));
        self.depth += 1;

        if let Some(o) = &service.options {
            self.check_uninterpreted(&o.uninterpreted_option, "service option")?;
            if let Some(v) = o.deprecated {
                self.line(&format!("option deprecated = {v};"));
            }
        }

        let scope = qualify(&self.scope, service.name());
        let outer = std::mem::replace(&mut self.scope, scope);
        for method in &service.method {
            let stream = |on: bool| if on { "stream " } else { "" };
            let signature = format!(
                "rpc {}({}{}) returns ({}{})",
                method.name(),
                stream(method.client_streaming()),
                self.type_ref(method.input_type()),
                stream(method.server_streaming()),
                self.type_ref(method.output_type()),
            );

            let mut opts = Vec::new();
            if let Some(o) = &method.options {
                self.check_uninterpreted(&o.uninterpreted_option, "method option")?;
                if let Some(v) = o.deprecated {
                    opts.push(format!("deprecated = {v}"));
                }
                if let Some(level) = o.idempotency_level {
                    let level = match level {
                        0 => "IDEMPOTENCY_UNKNOWN",
                        1 => "NO_SIDE_EFFECTS",
                        2 => "IDEMPOTENT",
                        other => return Err(self.fail(format!("idempotency_level value {other}"))),
                    };
                    opts.push(format!("idempotency_level = {level}"));
                }
            }

            if opts.is_empty() {
                self.line(&format!("{signature};"));
            } else {
                self.line(&format!("{signature} {{"));
                self.depth += 1;
                for opt in opts {
                    self.line(&format!("option {opt};"));
                }
                self.depth -= 1;
                self.line("}");
            }
        }
        self.scope = outer;

        self.depth -= 1;
        self.line("}");
        Ok(())
    }

    fn reserved(&mut self, ranges: &[String], names: &[String]) {
        if !ranges.is_empty() {
            self.line(&format!("reserved {};", ranges.join(", ")));
        }
        if !names.is_empty() {
            let names: Vec<String> = names.iter().map(|n| quote(n)).collect();
            self.line(&format!("reserved {};", names.join(", ")));
        }
    }

    /// Shortest suffix of a fully-qualified reference that protoc binds back
    /// to the same type from the current scope. Falls back to the leading-dot form.
    fn type_ref(&self, type_name: &str) -> String {
        let Some(full_name) = type_name.strip_prefix('.') else {
            return type_name.to_string();
        };
        let mut starts: Vec<usize> = full_name
            .match_indices('.')
            .map(|(i, _)| i + 1)
            .collect();
        starts.reverse();
        starts.push(0);
        for start in starts {
            let candidate = &full_name[start..];
            if self.symbols.resolve(&self.scope, candidate).as_deref() == Some(full_name) {
                return candidate.to_string();
            }
        }
        type_name.to_string()
    }

    /// `start to last` for an inclusive range; `None` means the end overflowed
    fn number_range(
        &self,
        what: &str,
        start: i32,
        last: Option<i32>,
        max: i32,
    ) -> Result<String> {
        let last = last.filter(|last| start <= *last).ok_or_else(|| {
            self.fail(format!("{what} range starting at {start} is empty or inverted"))
        })?;
        Ok(if start == last {
            start.to_string()
        } else if last == max {
            format!("{start} to max")
        } else {
            format!("{start} to {last}")
        })
    }

    fn check_uninterpreted(&self, options: &[UninterpretedOption], what: &str) -> Result<()> {
        match options.first() {
            None => Ok(()),
            Some(option) => {
                let name: Vec<String> = option
                    .name
                    .iter()
                    .map(|part| {
                        if part.is_extension {
                            format!("({})", part.name_part)
                        } else {
                            part.name_part.clone()
                        }
                    })
                    .collect();
                Err(self.fail(format!("uninterpreted {what} '{}'", name.join("."))))
            }
        }
    }
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

fn is_map_entry(message: &DescriptorProto) -> bool {
    message.options.as_ref().and_then(|o| o.map_entry) == Some(true)
}

fn map_entry<'m>(
    field: &FieldDescriptorProto,
    message: &'m DescriptorProto,
    full_name: &str,
) -> Option<&'m DescriptorProto> {
    if field.r#type != Some(TYPE_MESSAGE) || field.label != Some(LABEL_REPEATED) {
        return None;
    }
    let type_name = field.type_name();
    message.nested_type.iter().find(|nested| {
        is_map_entry(nested) && type_name == format!(".{full_name}.{}", nested.name())
    })
}

fn entry_field(entry: &DescriptorProto, number: i32) -> Option<&FieldDescriptorProto> {
    entry.field.iter().find(|f| f.number() == number)
}

/// lowerCamelCase name protoc derives when no json_name is given
fn default_json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\{:03o}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::descriptor_proto::{ExtensionRange, ReservedRange};
    use prost_types::enum_descriptor_proto::EnumReservedRange;
    use prost_types::uninterpreted_option::NamePart;
    use prost_types::{
        EnumValueDescriptorProto, EnumValueOptions, FileDescriptorProto, MessageOptions,
        MethodDescriptorProto, MethodOptions, OneofDescriptorProto,
    };

    fn field(name: &str, number: i32, label: i32, ty: i32) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(label),
            r#type: Some(ty),
            json_name: Some(default_json_name(name)),
            ..Default::default()
        }
    }

    fn typed(mut f: FieldDescriptorProto, type_name: &str) -> FieldDescriptorProto {
        f.type_name = Some(type_name.to_string());
        f
    }

    fn enum_value(name: &str, number: i32) -> EnumValueDescriptorProto {
        EnumValueDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            ..Default::default()
        }
    }

    fn schema_file(proto: FileDescriptorProto) -> SchemaFile {
        SchemaFile {
            proto,
            declared: Vec::new(),
            unretained_bytes: 0,
        }
    }

    fn render_one(proto: FileDescriptorProto) -> Result<String> {
        let file = schema_file(proto);
        render(&AssembledSchema {
            root: &file,
            files: vec![&file],
        })
    }

    fn user_proto() -> FileDescriptorProto {
        let mut email = field("email", 4, LABEL_OPTIONAL, TYPE_STRING);
        email.oneof_index = Some(0);
        let mut phone = field("phone_number", 5, LABEL_OPTIONAL, TYPE_STRING);
        phone.oneof_index = Some(0);
        let mut nickname = field("nickname", 6, LABEL_OPTIONAL, TYPE_STRING);
        nickname.oneof_index = Some(1);
        nickname.proto3_optional = Some(true);

        let user = DescriptorProto {
            name: Some("User".to_string()),
            field: vec![
                field("id", 1, LABEL_OPTIONAL, TYPE_STRING),
                typed(field("tags", 2, LABEL_REPEATED, TYPE_MESSAGE), ".acme.common.Tag"),
                typed(
                    field("labels", 3, LABEL_REPEATED, TYPE_MESSAGE),
                    ".acme.v1.User.LabelsEntry",
                ),
                email,
                phone,
                nickname,
            ],
            nested_type: vec![DescriptorProto {
                name: Some("LabelsEntry".to_string()),
                field: vec![
                    field("key", 1, LABEL_OPTIONAL, TYPE_STRING),
                    field("value", 2, LABEL_OPTIONAL, TYPE_STRING),
                ],
                options: Some(MessageOptions {
                    map_entry: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            enum_type: vec![EnumDescriptorProto {
                name: Some("Status".to_string()),
                value: vec![enum_value("STATUS_UNSPECIFIED", 0), enum_value("ACTIVE", 1)],
                ..Default::default()
            }],
            oneof_decl: vec![
                OneofDescriptorProto {
                    name: Some("contact".to_string()),
                    ..Default::default()
                },
                OneofDescriptorProto {
                    name: Some("_nickname".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let mut admin = enum_value("ADMIN", 1);
        admin.options = Some(EnumValueOptions {
            deprecated: Some(true),
            ..Default::default()
        });
        let role = EnumDescriptorProto {
            name: Some("Role".to_string()),
            value: vec![enum_value("ROLE_UNSPECIFIED", 0), admin],
            reserved_range: vec![EnumReservedRange {
                start: Some(5),
                end: Some(9),
            }],
            ..Default::default()
        };

        let service = ServiceDescriptorProto {
            name: Some("Users".to_string()),
            method: vec![
                MethodDescriptorProto {
                    name: Some("Get".to_string()),
                    input_type: Some(".acme.v1.User".to_string()),
                    output_type: Some(".acme.v1.User".to_string()),
                    ..Default::default()
                },
                MethodDescriptorProto {
                    name: Some("Watch".to_string()),
                    input_type: Some(".acme.common.Tag".to_string()),
                    output_type: Some(".acme.v1.User".to_string()),
                    server_streaming: Some(true),
                    options: Some(MethodOptions {
                        deprecated: Some(true),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        FileDescriptorProto {
            name: Some("acme/user.proto".to_string()),
            package: Some("acme.v1".to_string()),
            syntax: Some("proto3".to_string()),
            dependency: vec!["acme/common.proto".to_string()],
            options: Some(FileOptions {
                go_package: Some("acme/v1;acmev1".to_string()),
                ..Default::default()
            }),
            message_type: vec![user],
            enum_type: vec![role],
            service: vec![service],
            ..Default::default()
        }
    }

    #[test]
    fn test_render_proto3_file() {
        let expected = r#"// acme/user.proto
syntax = "proto3";

package acme.v1;

import "acme/common.proto";

option go_package = "acme/v1;acmev1";

message User {
  string id = 1;
  repeated acme.common.Tag tags = 2;
  map<string, string> labels = 3;
  oneof contact {
    string email = 4;
    string phone_number = 5;
  }
  optional string nickname = 6;
  enum Status {
    STATUS_UNSPECIFIED = 0;
    ACTIVE = 1;
  }
}

enum Role {
  ROLE_UNSPECIFIED = 0;
  ADMIN = 1 [deprecated = true];
  reserved 5 to 9;
}

service Users {
  rpc Get(User) returns (User);
  rpc Watch(acme.common.Tag) returns (stream User) {
    option deprecated = true;
  }
}
"#;
        assert_eq!(render_one(user_proto()).unwrap(), expected);
    }

    #[test]
    fn test_render_proto2_features() {
        let mut name = field("name", 1, LABEL_REQUIRED, TYPE_STRING);
        name.default_value = Some("a\"b".to_string());
        let mut count = field("count", 2, LABEL_OPTIONAL, 5);
        count.default_value = Some("7".to_string());
        let mut note = field("note", 100, LABEL_OPTIONAL, TYPE_STRING);
        note.extendee = Some(".Legacy".to_string());

        let proto = FileDescriptorProto {
            name: Some("legacy.proto".to_string()),
            dependency: vec!["base.proto".to_string()],
            public_dependency: vec![0],
            message_type: vec![DescriptorProto {
                name: Some("Legacy".to_string()),
                field: vec![name, count],
                extension_range: vec![ExtensionRange {
                    start: Some(100),
                    end: Some(536_870_912),
                    ..Default::default()
                }],
                reserved_range: vec![ReservedRange {
                    start: Some(5),
                    end: Some(6),
                }],
                reserved_name: vec!["old".to_string()],
                ..Default::default()
            }],
            extension: vec![note],
            ..Default::default()
        };

        let expected = r#"// legacy.proto
syntax = "proto2";

import public "base.proto";

message Legacy {
  required string name = 1 [default = "a\"b"];
  optional int32 count = 2 [default = 7];
  extensions 100 to max;
  reserved 5;
  reserved "old";
}

extend Legacy {
  optional string note = 100;
}
"#;
        assert_eq!(render_one(proto).unwrap(), expected);
    }

    #[test]
    fn test_custom_json_name_is_kept() {
        let mut f = field("user_id", 1, LABEL_OPTIONAL, 3);
        f.json_name = Some("uid".to_string());
        let proto = FileDescriptorProto {
            name: Some("a.proto".to_string()),
            syntax: Some("proto3".to_string()),
            message_type: vec![DescriptorProto {
                name: Some("A".to_string()),
                field: vec![f],
                ..Default::default()
            }],
            ..Default::default()
        };
        let text = render_one(proto).unwrap();
        assert!(text.contains("int64 user_id = 1 [json_name = \"uid\"];"));
    }

    fn assert_unrenderable(result: Result<String>, needle: &str) {
        match result {
            Err(Error::UnrenderableConstruct { construct, .. }) => {
                assert!(construct.contains(needle), "{construct}");
            }
            other => panic!("expected unrenderable, got {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_constructs_fail() {
        let mut proto = user_proto();
        proto.syntax = Some("editions".to_string());
        assert_unrenderable(render_one(proto), "syntax");

        let mut proto = user_proto();
        proto.message_type[0]
            .field
            .push(field("legacy", 9, LABEL_OPTIONAL, TYPE_GROUP));
        assert_unrenderable(render_one(proto), "group field legacy");

        let mut proto = user_proto();
        proto.options = Some(FileOptions {
            uninterpreted_option: vec![UninterpretedOption {
                name: vec![NamePart {
                    name_part: "acme.tenant".to_string(),
                    is_extension: true,
                }],
                ..Default::default()
            }],
            ..Default::default()
        });
        assert_unrenderable(render_one(proto), "(acme.tenant)");

        let mut proto = user_proto();
        proto.message_type[0].field[0].r#type = Some(42);
        assert_unrenderable(render_one(proto), "field type 42");
    }

    #[test]
    fn test_unretained_bytes_fail() {
        let mut file = schema_file(user_proto());
        file.unretained_bytes = 4;
        let result = render(&AssembledSchema {
            root: &file,
            files: vec![&file],
        });
        assert_unrenderable(result, "custom options");
    }

    #[test]
    fn test_failure_discards_earlier_files() {
        let good = schema_file(user_proto());
        let mut bad_proto = user_proto();
        bad_proto.name = Some("bad.proto".to_string());
        bad_proto.syntax = Some("proto4".to_string());
        let bad = schema_file(bad_proto);

        let result = render(&AssembledSchema {
            root: &bad,
            files: vec![&good, &bad],
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_render_all_prints_shared_files_once() {
        let base = schema_file(FileDescriptorProto {
            name: Some("base.proto".to_string()),
            ..Default::default()
        });
        let top = schema_file(FileDescriptorProto {
            name: Some("top.proto".to_string()),
            dependency: vec!["base.proto".to_string()],
            ..Default::default()
        });
        let schemas = vec![
            AssembledSchema {
                root: &top,
                files: vec![&base, &top],
            },
            AssembledSchema {
                root: &base,
                files: vec![&base],
            },
        ];
        let text = render_all(&schemas).unwrap();
        assert_eq!(text.matches("// base.proto").count(), 1);
        assert!(text.find("// base.proto").unwrap() < text.find("// top.proto").unwrap());
    }

    fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
        DescriptorProto {
            name: Some(name.to_string()),
            field: fields,
            ..Default::default()
        }
    }

    fn shadowing_file(package: &str) -> FileDescriptorProto {
        let prefix = if package.is_empty() {
            String::new()
        } else {
            format!(".{package}")
        };
        let mut outer = message(
            "Outer",
            vec![
                typed(
                    field("top", 1, LABEL_OPTIONAL, TYPE_MESSAGE),
                    &format!("{prefix}.Inner"),
                ),
                typed(
                    field("nested", 2, LABEL_OPTIONAL, TYPE_MESSAGE),
                    &format!("{prefix}.Outer.Inner"),
                ),
            ],
        );
        outer.nested_type.push(message("Inner", vec![]));
        FileDescriptorProto {
            name: Some("shadow.proto".to_string()),
            package: Some(package.to_string()).filter(|p| !p.is_empty()),
            syntax: Some("proto3".to_string()),
            message_type: vec![message("Inner", vec![]), outer],
            ..Default::default()
        }
    }

    #[test]
    fn test_nested_type_shadowing_keeps_qualifier() {
        let text = render_one(shadowing_file("pkg")).unwrap();
        assert!(text.contains("\n  pkg.Inner top = 1;\n"), "{text}");
        assert!(text.contains("\n  Inner nested = 2;\n"), "{text}");

        let text = render_one(shadowing_file("")).unwrap();
        assert!(text.contains("\n  .Inner top = 1;\n"), "{text}");
        assert!(text.contains("\n  Inner nested = 2;\n"), "{text}");
    }

    #[test]
    fn test_reference_captured_by_enclosing_package_keeps_leading_dot() {
        let foo = schema_file(FileDescriptorProto {
            name: Some("foo/bar.proto".to_string()),
            package: Some("foo".to_string()),
            syntax: Some("proto3".to_string()),
            message_type: vec![message("Bar", vec![])],
            ..Default::default()
        });
        let com_foo = schema_file(FileDescriptorProto {
            name: Some("com/foo/a.proto".to_string()),
            package: Some("com.foo".to_string()),
            syntax: Some("proto3".to_string()),
            dependency: vec!["foo/bar.proto".to_string()],
            message_type: vec![
                message(
                    "A",
                    vec![
                        typed(field("x", 1, LABEL_OPTIONAL, TYPE_MESSAGE), ".foo.Bar"),
                        typed(field("y", 2, LABEL_OPTIONAL, TYPE_MESSAGE), ".com.foo.Local"),
                    ],
                ),
                message("Local", vec![]),
            ],
            ..Default::default()
        });

        let text = render(&AssembledSchema {
            root: &com_foo,
            files: vec![&foo, &com_foo],
        })
        .unwrap();
        assert!(text.contains("\n  .foo.Bar x = 1;\n"), "{text}");
        assert!(text.contains("\n  Local y = 2;\n"), "{text}");
    }

    #[test]
    fn test_invalid_ranges_fail() {
        let mut proto = user_proto();
        proto.message_type[0].reserved_range.push(ReservedRange {
            start: Some(1),
            end: Some(i32::MIN),
        });
        assert_unrenderable(render_one(proto), "reserved range starting at 1");

        let mut proto = user_proto();
        proto.message_type[0].extension_range.push(ExtensionRange {
            start: Some(10),
            end: Some(5),
            ..Default::default()
        });
        assert_unrenderable(render_one(proto), "extension range starting at 10");

        let mut proto = user_proto();
        proto.enum_type[0].reserved_range.push(EnumReservedRange {
            start: Some(5),
            end: Some(2),
        });
        assert_unrenderable(render_one(proto), "enum reserved range starting at 5");
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a\\b\"c\n"), r#""a\\b\"c\n""#);
        assert_eq!(quote("\u{1}"), r#""\001""#);
    }
}
