use std::{
    any::TypeId,
    collections::{HashMap, HashSet},
};

use tracing::{debug, warn};

use crate::{
    aspect::AspectHandler,
    component::Component,
    container::Container,
    descriptor::{DependencyField, Descriptor, FieldSetter, Markers, Resolver},
    errors::BuildError,
    types::{Instance, TypeInfo},
};

/// Working state of one type while a container is built
pub(crate) struct ResolutionRecord {
    pub type_info: TypeInfo,
    /// Constructed here, or the exposed instance of an inherited component
    pub instance: Instance,
    /// Present exactly for local records
    pub descriptor: Option<Descriptor>,
    pub proxy: Option<Instance>,
    pub inherited: Option<Component>,
}

impl ResolutionRecord {
    pub fn is_local(&self) -> bool {
        self.inherited.is_none()
    }

    pub fn is_aspect_handler(&self) -> bool {
        self.is_local()
            && self
                .instance
                .provides(&TypeInfo::of::<dyn AspectHandler>())
    }
}

/// Ordered arena of resolution records, first seen wins
#[derive(Default)]
pub(crate) struct ResolutionGraph {
    pub records: Vec<ResolutionRecord>,
    index: HashMap<TypeId, usize>,
}

impl ResolutionGraph {
    fn insert(&mut self, record: ResolutionRecord) -> bool {
        let type_id = record.type_info.type_id;
        if self.index.contains_key(&type_id) {
            return false;
        }
        self.index.insert(type_id, self.records.len());
        self.records.push(record);
        true
    }

    pub fn contains(&self, type_info: &TypeInfo) -> bool {
        self.index.contains_key(&type_info.type_id)
    }

    /// Exact key, otherwise the first record whose instance can be seen as `type_info`
    pub fn lookup(&self, type_info: &TypeInfo) -> Option<usize> {
        self.index.get(&type_info.type_id).copied().or_else(|| {
            self.records
                .iter()
                .position(|record| record.instance.provides(type_info))
        })
    }

    /// Like [ResolutionGraph::lookup], a miss is a missing resource of `owner.field`
    pub fn require(
        &self,
        type_info: &TypeInfo,
        owner: &TypeInfo,
        field: &'static str,
    ) -> Result<usize, BuildError> {
        self.lookup(type_info).ok_or(BuildError::MissingResource {
            owner: owner.type_name,
            field,
            field_type: type_info.type_name,
        })
    }

    /// Dependency fields of the record at `index`, empty for inherited records
    fn fields_of(&self, index: usize) -> &[DependencyField] {
        self.records[index]
            .descriptor
            .as_ref()
            .map(|descriptor| descriptor.dependency_fields.as_slice())
            .unwrap_or_default()
    }

    /// (record, field) index pairs of the fields closing a field cycle
    ///
    /// Records are walked depth first in declaration order, a field pointing back
    /// at a record on the current path (or at its own owner) closes a cycle.
    fn back_references(&self) -> HashSet<(usize, usize)> {
        let mut marks = vec![Mark::Unvisited; self.records.len()];
        let mut back = HashSet::new();
        for index in 0..self.records.len() {
            self.mark_back_references(index, &mut marks, &mut back);
        }
        back
    }

    fn mark_back_references(
        &self,
        index: usize,
        marks: &mut [Mark],
        back: &mut HashSet<(usize, usize)>,
    ) {
        if marks[index] != Mark::Unvisited {
            return;
        }
        marks[index] = Mark::OnPath;
        for (position, field) in self.fields_of(index).iter().enumerate() {
            let Some(target) = self.lookup(&field.field_type) else {
                continue;
            };
            match marks[target] {
                Mark::OnPath => {
                    back.insert((index, position));
                }
                Mark::Unvisited => self.mark_back_references(target, marks, back),
                Mark::Done => {}
            }
        }
        marks[index] = Mark::Done;
    }

    /// Assigns every dependency field the raw (or inherited) instance of its type
    pub fn wire_fields(&self, setter: &dyn FieldSetter) -> Result<(), BuildError> {
        let back = self.back_references();
        for index in 0..self.records.len() {
            let owner = &self.records[index];
            for (position, field) in self.fields_of(index).iter().enumerate() {
                let value = self.require(&field.field_type, &owner.type_info, field.name)?;
                let weak = back.contains(&(index, position));
                set_field(setter, field, owner, &self.records[value].instance, weak)?;
            }
        }
        Ok(())
    }

    /// Re-assigns every field pointing at a proxied record with the proxy
    pub fn rewire_proxied(&self, setter: &dyn FieldSetter) -> Result<(), BuildError> {
        let back = self.back_references();
        for index in 0..self.records.len() {
            let owner = &self.records[index];
            for (position, field) in self.fields_of(index).iter().enumerate() {
                let value = self.require(&field.field_type, &owner.type_info, field.name)?;
                if let Some(proxy) = &self.records[value].proxy {
                    let weak = back.contains(&(index, position));
                    set_field(setter, field, owner, proxy, weak)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

fn set_field(
    setter: &dyn FieldSetter,
    field: &DependencyField,
    owner: &ResolutionRecord,
    value: &Instance,
    weak: bool,
) -> Result<(), BuildError> {
    let result = if weak {
        setter.set_back_reference(field, &owner.instance, value)
    } else {
        setter.set(field, &owner.instance, value)
    };
    result.map_err(|source| BuildError::Inject {
        owner: owner.type_info.type_name,
        field: field.name,
        source,
    })
}

/// Builds the [ResolutionGraph] of a container
pub(crate) struct GraphBuilder<'a> {
    resolver: &'a dyn Resolver,
    markers: &'a Markers,
    graph: ResolutionGraph,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(resolver: &'a dyn Resolver, markers: &'a Markers) -> Self {
        GraphBuilder {
            resolver,
            markers,
            graph: ResolutionGraph::default(),
        }
    }

    /// Seeds the graph with every component of every parent, in parent order
    pub fn inherit(&mut self, parents: &[Container]) {
        for parent in parents {
            for component in parent.components() {
                let seeded = self.graph.insert(ResolutionRecord {
                    type_info: component.type_info(),
                    instance: component.instance().clone(),
                    descriptor: None,
                    proxy: None,
                    inherited: Some(component.inherited()),
                });
                if seeded {
                    debug!("Inherited '{}'", component);
                }
            }
        }
    }

    /// Adds an already constructed local instance with an empty descriptor
    pub fn add_instance(&mut self, instance: Instance) {
        let type_info = instance.info;
        self.graph.insert(ResolutionRecord {
            type_info,
            instance,
            descriptor: Some(Descriptor::new(type_info)),
            proxy: None,
            inherited: None,
        });
    }

    /// Resolves `type_info` and everything it depends on
    pub fn resolve(&mut self, type_info: TypeInfo) -> Result<(), BuildError> {
        if self.graph.contains(&type_info) {
            return Ok(());
        }

        let descriptor = self
            .resolver
            .resolve(&type_info, self.markers)
            .map_err(|source| BuildError::Resolve {
                type_name: type_info.type_name,
                source,
            })?;

        let Some(instance) = descriptor.construct() else {
            warn!("'{}' can not be instantiated, skipping", type_info);
            return Ok(());
        };
        let instance = instance.map_err(|source| BuildError::Construct {
            type_name: type_info.type_name,
            source,
        })?;

        let field_types: Vec<TypeInfo> = descriptor
            .dependency_fields
            .iter()
            .map(|field| field.field_type)
            .filter(|field_type| *field_type != type_info)
            .collect();
        let param_types: Vec<TypeInfo> = descriptor.lifecycle_params().copied().collect();

        // Recorded before recursing, so field cycles terminate
        self.graph.insert(ResolutionRecord {
            type_info,
            instance,
            descriptor: Some(descriptor),
            proxy: None,
            inherited: None,
        });
        debug!("Resolved '{}'", type_info);

        for dependency in field_types.into_iter().chain(param_types) {
            self.resolve(dependency)?;
        }
        Ok(())
    }

    pub fn finish(self) -> ResolutionGraph {
        self.graph
    }
}
