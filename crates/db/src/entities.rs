//! Registry of every entity served by the generic CRUD layer.

use crate::metadata::{
    ColumnDef, ColumnKind, CurrencyType, DateType, EntityDef, FieldConfig, FieldType,
    FormMetadata, NumberType, RelationDef, SelectType,
};

use ColumnKind::{Boolean, Datetime, Integer, Json, Real, Text};

const ID: ColumnDef = ColumnDef::new("id", Integer)
    .not_null()
    .field(FieldConfig::new("ID", FieldType::Number).no_add().no_edit());
const CREATED_AT: ColumnDef = ColumnDef::new("created_at", Datetime)
    .not_null()
    .field(
        FieldConfig::new("Criado em", FieldType::Datetime)
            .no_add()
            .no_edit()
            .no_browse()
            .date(DateType::Datetime)
            .order(900),
    );
const UPDATED_AT: ColumnDef = ColumnDef::new("updated_at", Datetime)
    .not_null()
    .field(
        FieldConfig::new("Atualizado em", FieldType::Datetime)
            .no_add()
            .no_edit()
            .no_browse()
            .date(DateType::Datetime)
            .order(901),
    );
const CREATED_BY: ColumnDef = ColumnDef::new("created_by_fk_user_id", Integer);
const UPDATED_BY: ColumnDef = ColumnDef::new("updated_by_fk_user_id", Integer);

const AUDITED_RELATIONS: [RelationDef; 2] = [
    RelationDef {
        name: "created_by",
        column: "created_by_fk_user_id",
        target: "users",
    },
    RelationDef {
        name: "updated_by",
        column: "updated_by_fk_user_id",
        target: "users",
    },
];

pub static COMPANIES: EntityDef = EntityDef {
    slug: "companies",
    name: "Company",
    table: "companies",
    form: Some(FormMetadata {
        prefix: "company",
        table: "companies",
        singular_name: "Empresa",
        plural_name: "Empresas",
        icon: "building",
        version: "1.0.0",
    }),
    columns: &[
        ID,
        ColumnDef::new("company_name", Text).not_null().field(
            FieldConfig::new("Nome", FieldType::Text)
                .order(1)
                .width(6)
                .required()
                .tabs(&["main"]),
        ),
        ColumnDef::new("company_cnpj", Text).field(
            FieldConfig::new("CNPJ", FieldType::Text)
                .order(2)
                .width(6)
                .tabs(&["main"]),
        ),
        ColumnDef::new("company_address", Text).field(
            FieldConfig::new("Endereço", FieldType::Text)
                .order(3)
                .width(12)
                .no_browse()
                .tabs(&["contact"]),
        ),
        ColumnDef::new("company_telephone", Text).field(
            FieldConfig::new("Telefone", FieldType::Phone)
                .order(4)
                .width(6)
                .tabs(&["contact"]),
        ),
        ColumnDef::new("company_email", Text).field(
            FieldConfig::new("Email", FieldType::Email)
                .order(5)
                .width(6)
                .tabs(&["contact"]),
        ),
        ColumnDef::new("company_is_active", Boolean)
            .not_null()
            .field(FieldConfig::new("Ativa", FieldType::Checkbox).order(6).width(2)),
        CREATED_AT,
        UPDATED_AT,
        CREATED_BY,
        UPDATED_BY,
    ],
    relations: &AUDITED_RELATIONS,
    label_fields: &["company_name"],
    tenant_column: None,
    read_only: false,
};

pub static USERS: EntityDef = EntityDef {
    slug: "users",
    name: "User",
    table: "users",
    form: Some(FormMetadata {
        prefix: "user",
        table: "users",
        singular_name: "Usuário",
        plural_name: "Usuários",
        icon: "user",
        version: "1.0.0",
    }),
    columns: &[
        ID,
        ColumnDef::new("user_name", Text).field(
            FieldConfig::new("Nome", FieldType::Text)
                .order(1)
                .width(6),
        ),
        ColumnDef::new("user_email", Text).not_null().field(
            FieldConfig::new("Email", FieldType::Email)
                .order(2)
                .width(6)
                .required(),
        ),
        ColumnDef::new("user_password", Text)
            .not_null()
            .hidden()
            .field(
                FieldConfig::new("Senha", FieldType::Text)
                    .order(3)
                    .width(6)
                    .no_browse()
                    .no_read(),
            ),
        ColumnDef::new("user_telephone", Text).field(
            FieldConfig::new("Telefone", FieldType::Phone)
                .order(4)
                .width(6),
        ),
        ColumnDef::new("user_fk_company_id", Integer).not_null().field(
            FieldConfig::new("Empresa", FieldType::Select)
                .order(5)
                .width(6)
                .required()
                .select_url("companies/select-options"),
        ),
        ColumnDef::new("user_fk_role_id", Integer).field(
            FieldConfig::new("Perfil", FieldType::Select)
                .order(6)
                .width(6)
                .select_url("roles/select-options"),
        ),
        ColumnDef::new("user_is_active", Boolean)
            .not_null()
            .field(FieldConfig::new("Ativo", FieldType::Checkbox).order(7).width(2)),
        CREATED_AT,
        UPDATED_AT,
    ],
    relations: &[
        RelationDef {
            name: "company",
            column: "user_fk_company_id",
            target: "companies",
        },
        RelationDef {
            name: "role",
            column: "user_fk_role_id",
            target: "roles",
        },
    ],
    label_fields: &["user_name", "user_email"],
    tenant_column: Some("user_fk_company_id"),
    read_only: false,
};

pub static ROLES: EntityDef = EntityDef {
    slug: "roles",
    name: "Role",
    table: "roles",
    form: None,
    columns: &[
        ID,
        ColumnDef::new("role_name", Text).not_null().field(
            FieldConfig::new("Name", FieldType::Text)
                .order(1)
                .width(6)
                .required(),
        ),
        ColumnDef::new("role_description", Text).field(
            FieldConfig::new("Description", FieldType::Text)
                .order(2)
                .width(6),
        ),
        ColumnDef::new("role_permissions", Json).not_null().field(
            FieldConfig::new("Permissions", FieldType::Multiselect)
                .order(3)
                .width(12)
                .no_browse(),
        ),
        CREATED_AT,
        UPDATED_AT,
    ],
    relations: &[],
    label_fields: &["role_name"],
    tenant_column: None,
    read_only: false,
};

pub static PERMISSIONS: EntityDef = EntityDef {
    slug: "permissions",
    name: "Permission",
    table: "permissions",
    form: None,
    columns: &[
        ID,
        ColumnDef::new("permission_name", Text).not_null().field(
            FieldConfig::new("Name", FieldType::Text)
                .order(1)
                .width(4)
                .required(),
        ),
        ColumnDef::new("permission_description", Text).field(
            FieldConfig::new("Description", FieldType::Text)
                .order(2)
                .width(8),
        ),
        ColumnDef::new("permission_resource", Text).not_null().field(
            FieldConfig::new("Resource", FieldType::Text)
                .order(3)
                .width(6)
                .required(),
        ),
        ColumnDef::new("permission_action", Text).not_null().field(
            FieldConfig::new("Action", FieldType::Select)
                .order(4)
                .width(6)
                .required()
                .select_options(SelectType::Single, &["create", "read", "update", "delete"]),
        ),
        CREATED_AT,
        UPDATED_AT,
    ],
    relations: &[],
    label_fields: &["permission_name"],
    tenant_column: None,
    read_only: false,
};

pub static SITUATIONS: EntityDef = EntityDef {
    slug: "situations",
    name: "Situation",
    table: "situations",
    form: None,
    columns: &[
        ID,
        ColumnDef::new("situation_code", Text).not_null().field(
            FieldConfig::new("Código", FieldType::Text)
                .order(1)
                .width(3),
        ),
        ColumnDef::new("situation_name", Text).not_null().field(
            FieldConfig::new("Nome", FieldType::Text)
                .order(2)
                .width(3),
        ),
        ColumnDef::new("situation_description", Text).not_null().field(
            FieldConfig::new("Descrição", FieldType::Text)
                .order(2)
                .width(5),
        ),
        CREATED_AT,
        UPDATED_AT,
        CREATED_BY,
        UPDATED_BY,
    ],
    relations: &AUDITED_RELATIONS,
    label_fields: &["situation_code", "situation_name"],
    tenant_column: None,
    read_only: false,
};

pub static PROJECTS: EntityDef = EntityDef {
    slug: "projects",
    name: "Project",
    table: "projects",
    form: Some(FormMetadata {
        prefix: "project",
        table: "projects",
        singular_name: "Projeto",
        plural_name: "Projetos",
        icon: "project",
        version: "1.0.0",
    }),
    columns: &[
        ID,
        ColumnDef::new("project_code", Text).not_null().field(
            FieldConfig::new("Código", FieldType::Text)
                .order(1)
                .width(4)
                .required(),
        ),
        ColumnDef::new("project_description", Text).not_null().field(
            FieldConfig::new("Descrição", FieldType::Text)
                .order(2)
                .width(8),
        ),
        ColumnDef::new("project_obs", Text).field(
            FieldConfig::new("Observações", FieldType::Richtext)
                .order(3)
                .width(12),
        ),
        ColumnDef::new("project_fk_situation_id", Integer).field(
            FieldConfig::new("Situação", FieldType::Select)
                .order(4)
                .width(4)
                .required()
                .select_url("situations/select-options"),
        ),
        ColumnDef::new("project_initial_date", Datetime).field(
            FieldConfig::new("Data de Início", FieldType::Date)
                .order(5)
                .width(4)
                .date(DateType::Date),
        ),
        ColumnDef::new("project_final_date", Datetime).field(
            FieldConfig::new("Data de Término", FieldType::Date)
                .order(6)
                .width(4)
                .no_add()
                .date(DateType::Date),
        ),
        CREATED_AT,
        UPDATED_AT,
        CREATED_BY,
        UPDATED_BY,
    ],
    relations: &[
        RelationDef {
            name: "situation",
            column: "project_fk_situation_id",
            target: "situations",
        },
        AUDITED_RELATIONS[0],
        AUDITED_RELATIONS[1],
    ],
    label_fields: &["project_code", "project_description"],
    tenant_column: None,
    read_only: false,
};

pub static PROJECT_ITEMS: EntityDef = EntityDef {
    slug: "project_items",
    name: "ProjectItem",
    table: "project_items",
    form: Some(FormMetadata {
        prefix: "project_item",
        table: "project_items",
        singular_name: "Project Item",
        plural_name: "Project Items",
        icon: "project-management",
        version: "1.0.0",
    }),
    columns: &[
        ID,
        ColumnDef::new("project_item_fk_project_id", Integer).not_null().field(
            FieldConfig::new("Projeto", FieldType::Select)
                .order(1)
                .width(6)
                .required()
                .select_url("projects/select-options")
                .tabs(&["main"]),
        ),
        ColumnDef::new("project_item_description", Text).not_null().field(
            FieldConfig::new("Descrição", FieldType::Text)
                .order(2)
                .width(4)
                .required()
                .tabs(&["main"]),
        ),
        ColumnDef::new("project_item_fk_situation_id", Integer).field(
            FieldConfig::new("Situação", FieldType::Select)
                .order(4)
                .width(4)
                .required()
                .select_url("situations/select-options")
                .tabs(&["main"]),
        ),
        ColumnDef::new("project_item_observation", Text).field(
            FieldConfig::new("Observações", FieldType::Textarea)
                .order(8)
                .width(12)
                .tabs(&["main"]),
        ),
        ColumnDef::new("project_item_budget", Real).field(
            FieldConfig::new("Orçamento", FieldType::Currency)
                .width(9)
                .currency(CurrencyType::Brl)
                .number(NumberType::Currency, Some(0.0), None)
                .tabs(&["financial"]),
        ),
        CREATED_AT,
        UPDATED_AT,
        CREATED_BY,
        UPDATED_BY,
    ],
    relations: &[
        RelationDef {
            name: "project",
            column: "project_item_fk_project_id",
            target: "projects",
        },
        RelationDef {
            name: "situation",
            column: "project_item_fk_situation_id",
            target: "situations",
        },
        AUDITED_RELATIONS[0],
        AUDITED_RELATIONS[1],
    ],
    label_fields: &["project_item_description"],
    tenant_column: None,
    read_only: false,
};

pub static CLIENTS: EntityDef = EntityDef {
    slug: "clients",
    name: "Client",
    table: "clients",
    form: Some(FormMetadata {
        prefix: "client",
        table: "clients",
        singular_name: "Client",
        plural_name: "Clients",
        icon: "user-group",
        version: "1.0.0",
    }),
    columns: &[
        ID,
        ColumnDef::new("client_name", Text).not_null().field(
            FieldConfig::new("Nome", FieldType::Text)
                .order(2)
                .width(8)
                .required()
                .tabs(&["main"]),
        ),
        ColumnDef::new("client_email", Text).field(
            FieldConfig::new("Email", FieldType::Email)
                .order(3)
                .width(6)
                .tabs(&["contact"]),
        ),
        ColumnDef::new("client_phone", Text).field(
            FieldConfig::new("Telefone", FieldType::Phone)
                .order(4)
                .width(6)
                .tabs(&["contact"]),
        ),
        ColumnDef::new("client_observation", Text).field(
            FieldConfig::new("Observações", FieldType::Textarea)
                .order(5)
                .width(12)
                .tabs(&["main"]),
        ),
        CREATED_AT,
        UPDATED_AT,
        CREATED_BY,
        UPDATED_BY,
    ],
    relations: &AUDITED_RELATIONS,
    label_fields: &["client_name"],
    tenant_column: None,
    read_only: false,
};

pub static NOTIFICATIONS: EntityDef = EntityDef {
    slug: "notifications",
    name: "Notification",
    table: "notifications",
    form: None,
    columns: &[
        ID,
        ColumnDef::new("notification_fk_user_id", Integer).not_null().field(
            FieldConfig::new("Usuário", FieldType::Select)
                .order(1)
                .width(6)
                .required()
                .select_url("users/select-options"),
        ),
        ColumnDef::new("notification_type", Text).not_null().field(
            FieldConfig::new("Tipo", FieldType::Text)
                .order(2)
                .width(6)
                .required(),
        ),
        ColumnDef::new("notification_title", Text).not_null().field(
            FieldConfig::new("Título", FieldType::Text)
                .order(3)
                .width(12)
                .required(),
        ),
        ColumnDef::new("notification_message", Text).not_null().field(
            FieldConfig::new("Mensagem", FieldType::Textarea)
                .order(4)
                .width(12)
                .required(),
        ),
        ColumnDef::new("notification_read", Boolean)
            .not_null()
            .field(FieldConfig::new("Lida", FieldType::Checkbox).order(5).width(2)),
        CREATED_AT,
        UPDATED_AT,
    ],
    relations: &[RelationDef {
        name: "user",
        column: "notification_fk_user_id",
        target: "users",
    }],
    label_fields: &["notification_title"],
    tenant_column: None,
    read_only: false,
};

pub static AUDITS: EntityDef = EntityDef {
    slug: "audits",
    name: "Audit",
    table: "audits",
    form: None,
    columns: &[
        ID,
        ColumnDef::new("audit_entity_name", Text)
            .not_null()
            .field(FieldConfig::new("Entidade", FieldType::Text).order(1)),
        ColumnDef::new("audit_entity_id", Integer)
            .field(FieldConfig::new("Registro", FieldType::Number).order(2)),
        ColumnDef::new("audit_action", Text)
            .not_null()
            .field(FieldConfig::new("Ação", FieldType::Text).order(3)),
        ColumnDef::new("audit_old_values", Json).field(
            FieldConfig::new("Valores anteriores", FieldType::Textarea)
                .order(4)
                .no_browse(),
        ),
        ColumnDef::new("audit_new_values", Json).field(
            FieldConfig::new("Novos valores", FieldType::Textarea)
                .order(5)
                .no_browse(),
        ),
        ColumnDef::new("audit_observation", Text)
            .field(FieldConfig::new("Observação", FieldType::Text).order(6)),
        ColumnDef::new("audit_fk_user_id", Integer)
            .field(FieldConfig::new("Usuário", FieldType::Number).order(7)),
        ColumnDef::new("created_at", Datetime).not_null().field(
            FieldConfig::new("Data", FieldType::Datetime)
                .order(8)
                .date(DateType::Datetime),
        ),
    ],
    relations: &[RelationDef {
        name: "user",
        column: "audit_fk_user_id",
        target: "users",
    }],
    label_fields: &["audit_entity_name", "audit_action"],
    tenant_column: None,
    read_only: true,
};

static REGISTRY: [&EntityDef; 10] = [
    &COMPANIES,
    &USERS,
    &ROLES,
    &PERMISSIONS,
    &SITUATIONS,
    &PROJECTS,
    &PROJECT_ITEMS,
    &CLIENTS,
    &NOTIFICATIONS,
    &AUDITS,
];

pub fn all() -> &'static [&'static EntityDef] {
    &REGISTRY
}

pub fn find(slug: &str) -> Option<&'static EntityDef> {
    REGISTRY.iter().copied().find(|def| def.slug == slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugs_are_unique() {
        let mut slugs: Vec<_> = all().iter().map(|d| d.slug).collect();
        slugs.sort();
        slugs.dedup();
        assert_eq!(slugs.len(), all().len());
    }

    #[test]
    fn test_relations_point_to_registered_entities() {
        for def in all() {
            for relation in def.relations {
                assert!(find(relation.target).is_some(), "{} -> {}", def.slug, relation.target);
                assert!(def.has_column(relation.column), "{}.{}", def.slug, relation.column);
            }
        }
    }

    #[test]
    fn test_label_and_tenant_columns_exist() {
        for def in all() {
            for field in def.label_fields {
                assert!(def.has_column(field), "{}.{}", def.slug, field);
            }
            if let Some(tenant) = def.tenant_column {
                assert!(def.has_column(tenant));
            }
        }
    }

    #[test]
    fn test_password_is_hidden() {
        let column = USERS.column("user_password").unwrap();
        assert!(column.hidden);
        assert!(USERS.visible_columns().all(|c| c.name != "user_password"));
    }
}
