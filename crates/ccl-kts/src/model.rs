//! Static description of the API a build script is compiled against: the
//! script type, Gradle and JDK types, top-level functions and constructors.

use ccl_core::oracle::{normalize_accessor, CallableDescriptor, CallableKind, TypeDescriptor};
use itertools::Itertools;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

const BUILTIN_MODEL: &str = include_str!("../data/gradle-api.toml");

/// Stands for the type a member function is called on.
pub const SELF_TYPE: &str = "Self";

pub const ANY: &str = "kotlin.Any";
pub const UNIT: &str = "kotlin.Unit";

static BUILTIN: Lazy<ApiModel> = Lazy::new(|| {
    ApiModel::from_toml_str(BUILTIN_MODEL).expect("embedded gradle-api.toml must parse")
});

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid API model: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("type {0} is declared twice")]
    DuplicateType(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelFile {
    script_type: String,
    #[serde(default)]
    types: Vec<TypeSpec>,
    #[serde(default)]
    functions: Vec<FunctionSpec>,
    #[serde(default)]
    constructors: Vec<ConstructorSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeSpec {
    pub name: String,
    #[serde(default)]
    pub supertypes: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
    #[serde(default)]
    pub functions: Vec<FunctionSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertySpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub getter: Option<String>,
}

impl PropertySpec {
    pub fn getter_name(&self) -> String {
        match &self.getter {
            Some(getter) => getter.clone(),
            None => default_getter(&self.name),
        }
    }

    pub fn callable(&self) -> CallableDescriptor {
        CallableDescriptor::getter(self.getter_name())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default)]
    pub parameters: usize,
    /// `None` when the result type is not modelled.
    pub returns: Option<String>,
    /// Implicit receiver of a trailing lambda argument.
    pub lambda_receiver: Option<String>,
    /// Type of `it` in a trailing lambda argument.
    pub lambda_parameter: Option<String>,
    /// `register<Copy>("x") { }` configures a `Copy`.
    #[serde(default)]
    pub lambda_receiver_from_type_argument: bool,
}

impl FunctionSpec {
    pub fn callable(&self) -> CallableDescriptor {
        CallableDescriptor::new(self.name.clone(), self.parameters, CallableKind::Function)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstructorSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub parameters: usize,
}

impl ConstructorSpec {
    pub fn callable(&self) -> CallableDescriptor {
        CallableDescriptor::new(self.name.clone(), self.parameters, CallableKind::Constructor)
    }
}

/// JVM getter of a Kotlin property: `taskDependencies` is read through
/// `getTaskDependencies`.
pub fn default_getter(property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("get{}{}", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

/// A type name as written in the model: `a.b.C` or `a.b.C?`.
pub fn split_nullable(name: &str) -> (&str, bool) {
    match name.strip_suffix('?') {
        Some(base) => (base, true),
        None => (name, false),
    }
}

#[derive(Debug, Clone)]
pub struct ApiModel {
    script_type: String,
    types: HashMap<String, TypeSpec>,
    /// Simple name to fully-qualified name, for default imports.
    simple_names: HashMap<String, String>,
    functions: Vec<FunctionSpec>,
    constructors: HashMap<String, ConstructorSpec>,
}

impl ApiModel {
    pub fn builtin() -> &'static ApiModel {
        &BUILTIN
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ModelError> {
        let file: ModelFile = toml::from_str(source)?;
        let mut types = HashMap::new();
        for spec in file.types {
            let name = spec.name.clone();
            if types.insert(name.clone(), spec).is_some() {
                return Err(ModelError::DuplicateType(name));
            }
        }
        // later entries with the same simple name do not shadow earlier ones
        let mut simple_names = HashMap::new();
        for name in types.keys().sorted() {
            let simple = name.rsplit('.').next().unwrap_or(name);
            simple_names
                .entry(simple.to_string())
                .or_insert_with(|| name.clone());
        }
        let constructors = file
            .constructors
            .into_iter()
            .map(|spec| (spec.name.clone(), spec))
            .collect();
        Ok(Self {
            script_type: file.script_type,
            types,
            simple_names,
            functions: file.functions,
            constructors,
        })
    }

    pub fn script_type(&self) -> &str {
        &self.script_type
    }

    pub fn type_spec(&self, fq_name: &str) -> Option<&TypeSpec> {
        self.types.get(fq_name)
    }

    /// Fully-qualified name for a simple or qualified type name.
    pub fn qualify(&self, name: &str) -> Option<&str> {
        if let Some((fq, _)) = self.types.get_key_value(name) {
            return Some(fq.as_str());
        }
        self.simple_names.get(name).map(String::as_str)
    }

    /// All supertypes of `fq_name`, nearest first. Every type but
    /// `kotlin.Any` ends with it.
    pub fn supertypes(&self, fq_name: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = std::collections::VecDeque::from([fq_name.to_string()]);
        while let Some(current) = queue.pop_front() {
            let Some(spec) = self.types.get(&current) else {
                continue;
            };
            for parent in &spec.supertypes {
                if parent != fq_name && seen.insert(parent.clone()) {
                    order.push(parent.clone());
                    queue.push_back(parent.clone());
                }
            }
        }
        if fq_name != ANY && !seen.contains(ANY) {
            order.push(ANY.to_string());
        }
        order
    }

    /// Descriptor for a model type name, which may carry a `?`.
    pub fn descriptor(&self, name: &str) -> TypeDescriptor {
        let (base, nullable) = split_nullable(name);
        TypeDescriptor::new(base)
            .with_supertypes(self.supertypes(base))
            .nullable(nullable)
    }

    /// Member property of a type or any of its supertypes.
    pub fn property<'m>(&'m self, ty: &TypeDescriptor, name: &str) -> Option<&'m PropertySpec> {
        ty.lineage()
            .filter_map(|fq| self.types.get(fq))
            .flat_map(|spec| spec.properties.iter())
            .find(|property| property.name == name)
    }

    /// Member function called with `arguments` values, preferring an
    /// exact arity match over the first overload by name.
    pub fn function<'m>(
        &'m self,
        ty: &TypeDescriptor,
        name: &str,
        arguments: usize,
    ) -> Option<&'m FunctionSpec> {
        let candidates = ty
            .lineage()
            .filter_map(|fq| self.types.get(fq))
            .flat_map(|spec| spec.functions.iter())
            .filter(|function| function.name == name);
        pick_overload(candidates, arguments)
    }

    /// Property read through its JVM getter: `getProject()`.
    pub fn property_by_getter<'m>(
        &'m self,
        ty: &TypeDescriptor,
        getter: &str,
    ) -> Option<&'m PropertySpec> {
        let name = normalize_accessor(getter);
        self.property(ty, &name)
            .filter(|property| property.getter_name() == getter)
    }

    pub fn top_level_function(&self, name: &str, arguments: usize) -> Option<&FunctionSpec> {
        pick_overload(
            self.functions.iter().filter(|function| function.name == name),
            arguments,
        )
    }

    pub fn constructor(&self, name: &str) -> Option<&ConstructorSpec> {
        self.constructors.get(name)
    }
}

fn pick_overload<'m>(
    candidates: impl Iterator<Item = &'m FunctionSpec>,
    arguments: usize,
) -> Option<&'m FunctionSpec> {
    let mut first = None;
    for candidate in candidates {
        if candidate.parameters == arguments {
            return Some(candidate);
        }
        first.get_or_insert(candidate);
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_model_parses() {
        let model = ApiModel::builtin();
        assert_eq!(model.script_type(), "Build_gradle");
        assert_eq!(model.qualify("Thread"), Some("java.lang.Thread"));
        assert_eq!(model.qualify("FileCollection"), Some("org.gradle.api.file.FileCollection"));
        assert!(model.constructor("Thread").is_some());
    }

    #[test]
    fn supertypes_are_transitive() {
        let model = ApiModel::builtin();
        let copy = model.descriptor("org.gradle.api.tasks.Copy");
        assert!(copy.is_instance_of("org.gradle.api.Task"));
        assert!(copy.is_instance_of("kotlin.Any"));
        let configuration = model.descriptor("org.gradle.api.artifacts.Configuration?");
        assert!(configuration.nullable);
        assert!(configuration.is_instance_of("org.gradle.api.file.FileCollection"));
    }

    #[test]
    fn members_are_inherited() {
        let model = ApiModel::builtin();
        let script = model.descriptor("Build_gradle");
        let layout = model.property(&script, "layout").unwrap();
        assert_eq!(layout.ty, "org.gradle.api.file.ProjectLayout");
        assert_eq!(layout.getter_name(), "getLayout");

        let task = model.descriptor("org.gradle.api.DefaultTask");
        let do_last = model.function(&task, "doLast", 1).unwrap();
        assert_eq!(do_last.lambda_receiver.as_deref(), Some("org.gradle.api.Task"));
        assert!(model.function(&task, "apply", 1).is_some());
        assert_eq!(
            model.property_by_getter(&task, "getProject").map(|p| p.name.as_str()),
            Some("project")
        );
    }

    #[test]
    fn overloads_prefer_matching_arity() {
        let model = ApiModel::from_toml_str(
            r#"
            script_type = "S"
            [[functions]]
            name = "f"
            returns = "kotlin.Unit"
            [[functions]]
            name = "f"
            parameters = 2
            returns = "kotlin.String"
            "#,
        )
        .unwrap();
        assert_eq!(model.top_level_function("f", 2).unwrap().returns.as_deref(), Some("kotlin.String"));
        assert_eq!(model.top_level_function("f", 1).unwrap().returns.as_deref(), Some("kotlin.Unit"));
    }

    #[test]
    fn duplicate_types_are_rejected() {
        let err = ApiModel::from_toml_str(
            "script_type = \"S\"\n[[types]]\nname = \"a.B\"\n[[types]]\nname = \"a.B\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateType(name) if name == "a.B"));
    }
}
